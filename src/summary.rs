use crate::calc::{self, round1};
use crate::model::{Assignment, AttendanceRecord, AttendanceStatus, Grade, Student};
use chrono::NaiveDate;

/// Records for `day` carrying the given status.
pub fn status_count(records: &[AttendanceRecord], day: NaiveDate, status: AttendanceStatus) -> usize {
    records
        .iter()
        .filter(|r| r.date == day && r.status == status)
        .count()
}

/// Present students over roster size for `today`, as a percentage rounded to
/// one decimal. An empty roster is 0, never a division by zero.
pub fn attendance_rate_today(
    students: &[Student],
    records: &[AttendanceRecord],
    today: NaiveDate,
) -> f64 {
    if students.is_empty() {
        return 0.0;
    }
    let present = status_count(records, today, AttendanceStatus::Present);
    round1(100.0 * present as f64 / students.len() as f64)
}

/// Class-wide average: the arithmetic mean over assignments of each
/// assignment's class-average percentage. A mean of means, not score
/// weighted, matching the convention used across the aggregator.
pub fn class_average(assignments: &[Assignment], grades: &[Grade]) -> f64 {
    if assignments.is_empty() {
        return 0.0;
    }
    let sum: f64 = assignments
        .iter()
        .map(|a| calc::class_average_for_assignment(assignments, grades, a.id))
        .sum();
    sum / assignments.len() as f64
}

/// The `n` most recently submitted grades, newest first. The sort is stable,
/// so equal timestamps keep store order.
pub fn recent_grades(grades: &[Grade], n: usize) -> Vec<Grade> {
    let mut out = grades.to_vec();
    out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    out.truncate(n);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, RecordId};
    use chrono::{TimeZone, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn student(id: RecordId) -> Student {
        Student {
            id,
            first_name: format!("First{}", id),
            last_name: format!("Last{}", id),
            email: format!("s{}@school.test", id),
            student_no: format!("S-{:03}", id),
            grade_level: "10th".to_string(),
            photo_url: None,
            marks: None,
        }
    }

    fn assignment(id: RecordId, points: f64) -> Assignment {
        Assignment {
            id,
            title: format!("Assignment {}", id),
            category: Category::Quiz,
            points,
            weight: 1.0,
            due_date: day(2024, 1, 12),
        }
    }

    fn record(id: RecordId, student_id: RecordId, date: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id,
            student_id,
            date,
            status,
            notes: None,
        }
    }

    fn graded_at(id: RecordId, assignment_id: RecordId, score: f64, hour: u32) -> Grade {
        Grade {
            id,
            student_id: 1,
            assignment_id,
            score,
            submitted_at: Utc.with_ymd_and_hms(2024, 1, 8, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn attendance_rate_with_no_students_is_zero() {
        let today = day(2024, 1, 8);
        assert_eq!(attendance_rate_today(&[], &[], today), 0.0);
    }

    #[test]
    fn attendance_rate_counts_only_today_and_present() {
        let today = day(2024, 1, 8);
        let students: Vec<Student> = (1..=3).map(student).collect();
        let records = vec![
            record(1, 1, today, AttendanceStatus::Present),
            record(2, 2, today, AttendanceStatus::Late),
            record(3, 3, day(2024, 1, 5), AttendanceStatus::Present),
        ];
        // 1 of 3 present today => 33.3 after 1-decimal rounding.
        assert_eq!(attendance_rate_today(&students, &records, today), 33.3);
    }

    #[test]
    fn status_counts_bucket_by_day() {
        let today = day(2024, 1, 8);
        let records = vec![
            record(1, 1, today, AttendanceStatus::Absent),
            record(2, 2, today, AttendanceStatus::Absent),
            record(3, 3, day(2024, 1, 9), AttendanceStatus::Absent),
        ];
        assert_eq!(status_count(&records, today, AttendanceStatus::Absent), 2);
        assert_eq!(status_count(&records, today, AttendanceStatus::Excused), 0);
    }

    #[test]
    fn class_average_is_a_mean_of_assignment_means() {
        let assignments = vec![assignment(1, 100.0), assignment(2, 50.0)];
        let grades = vec![
            graded_at(1, 1, 80.0, 9),
            graded_at(2, 2, 50.0, 9),
        ];
        // 80% and 100% average to 90, regardless of point totals.
        assert_eq!(class_average(&assignments, &grades), 90.0);
    }

    #[test]
    fn class_average_with_no_assignments_is_zero() {
        assert_eq!(class_average(&[], &[]), 0.0);
    }

    #[test]
    fn gradeless_assignments_drag_the_class_average_down() {
        let assignments = vec![assignment(1, 100.0), assignment(2, 100.0)];
        let grades = vec![graded_at(1, 1, 100.0, 9)];
        assert_eq!(class_average(&assignments, &grades), 50.0);
    }

    #[test]
    fn recent_grades_sort_newest_first_with_stable_ties() {
        let grades = vec![
            graded_at(1, 1, 10.0, 9),
            graded_at(2, 2, 20.0, 11),
            graded_at(3, 3, 30.0, 9),
            graded_at(4, 4, 40.0, 10),
        ];
        let recent = recent_grades(&grades, 3);
        assert_eq!(recent.iter().map(|g| g.id).collect::<Vec<_>>(), vec![2, 4, 1]);

        let all = recent_grades(&grades, 10);
        assert_eq!(all.iter().map(|g| g.id).collect::<Vec<_>>(), vec![2, 4, 1, 3]);
    }
}
