use crate::model::{Assignment, Grade, RecordId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// 1-decimal display rounding: `floor(10x + 0.5) / 10`.
pub fn round1(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// Scores below zero or not finite degrade to 0 rather than failing;
/// interactive cell editing never rejects input.
pub fn sanitize_score(score: f64) -> f64 {
    if score.is_finite() && score >= 0.0 {
        score
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
    F,
}

impl Letter {
    pub fn as_str(self) -> &'static str {
        match self {
            Letter::A => "A",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
            Letter::F => "F",
        }
    }
}

/// Letter bands partition [0, inf): >=90 A, >=80 B, >=70 C, >=60 D, else F,
/// lower bound inclusive. A non-positive max degrades the percentage to 0.
pub fn letter_grade(score: f64, points: f64) -> Letter {
    let percent = if points > 0.0 {
        100.0 * score / points
    } else {
        0.0
    };
    if percent >= 90.0 {
        Letter::A
    } else if percent >= 80.0 {
        Letter::B
    } else if percent >= 70.0 {
        Letter::C
    } else if percent >= 60.0 {
        Letter::D
    } else {
        Letter::F
    }
}

/// First grade whose (student, assignment) pair matches, in store order.
pub fn find_grade(
    grades: &[Grade],
    student_id: RecordId,
    assignment_id: RecordId,
) -> Option<&Grade> {
    grades
        .iter()
        .find(|g| g.student_id == student_id && g.assignment_id == assignment_id)
}

/// Composite-key index over a grade snapshot. At most one grade per
/// (student, assignment) pair is meaningful; when duplicate rows exist the
/// first row in store order wins.
pub struct GradeBook<'a> {
    by_pair: HashMap<(RecordId, RecordId), &'a Grade>,
}

impl<'a> GradeBook<'a> {
    pub fn index(grades: &'a [Grade]) -> Self {
        let mut by_pair = HashMap::new();
        for g in grades {
            by_pair.entry((g.student_id, g.assignment_id)).or_insert(g);
        }
        Self { by_pair }
    }

    pub fn find(&self, student_id: RecordId, assignment_id: RecordId) -> Option<&'a Grade> {
        self.by_pair.get(&(student_id, assignment_id)).copied()
    }

    /// Earned points over maximum points across ALL assignments, as a
    /// percentage. An ungraded assignment contributes 0 earned; a zero
    /// maximum total yields 0.
    pub fn student_average(&self, assignments: &[Assignment], student_id: RecordId) -> f64 {
        let total: f64 = assignments.iter().map(|a| a.points).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let earned: f64 = assignments
            .iter()
            .map(|a| self.find(student_id, a.id).map_or(0.0, |g| g.score))
            .sum();
        100.0 * earned / total
    }
}

/// Mean score for one assignment as a percentage of its maximum. 0 with no
/// grades, and 0 when the assignment itself is missing from the snapshot
/// (degrade, never fail).
pub fn class_average_for_assignment(
    assignments: &[Assignment],
    grades: &[Grade],
    assignment_id: RecordId,
) -> f64 {
    let Some(assignment) = assignments.iter().find(|a| a.id == assignment_id) else {
        return 0.0;
    };
    if assignment.points <= 0.0 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut count = 0usize;
    for g in grades.iter().filter(|g| g.assignment_id == assignment_id) {
        sum += g.score;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    100.0 * (sum / count as f64) / assignment.points
}

#[derive(Debug, Clone, PartialEq)]
pub enum GradeUpsert {
    Update {
        id: RecordId,
        score: f64,
        submitted_at: DateTime<Utc>,
    },
    Insert(Grade),
}

/// Decide how a cell edit lands on the collection: replace the first matching
/// pair's score (refreshing the submission timestamp), or append a fresh-id
/// grade. The score is sanitized here so every caller shares the coercion.
pub fn plan_upsert(
    grades: &[Grade],
    student_id: RecordId,
    assignment_id: RecordId,
    score: f64,
    now: DateTime<Utc>,
) -> GradeUpsert {
    let score = sanitize_score(score);
    match find_grade(grades, student_id, assignment_id) {
        Some(existing) => GradeUpsert::Update {
            id: existing.id,
            score,
            submitted_at: now,
        },
        None => {
            let id = grades.iter().map(|g| g.id).max().unwrap_or(0) + 1;
            GradeUpsert::Insert(Grade {
                id,
                student_id,
                assignment_id,
                score,
                submitted_at: now,
            })
        }
    }
}

/// Pure value-returning upsert; the caller persists the result.
pub fn upsert_grade(
    grades: &[Grade],
    student_id: RecordId,
    assignment_id: RecordId,
    score: f64,
    now: DateTime<Utc>,
) -> Vec<Grade> {
    let mut out = grades.to_vec();
    match plan_upsert(grades, student_id, assignment_id, score, now) {
        GradeUpsert::Update {
            id,
            score,
            submitted_at,
        } => {
            if let Some(g) = out.iter_mut().find(|g| g.id == id) {
                g.score = score;
                g.submitted_at = submitted_at;
            }
        }
        GradeUpsert::Insert(g) => out.push(g),
    }
    out
}
