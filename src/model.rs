use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub type RecordId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_no: String,
    pub grade_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<f64>,
}

impl Student {
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Assignment category. The five named kinds are what the UI offers; unknown
/// names round-trip untouched so new categories don't require a code change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Quiz,
    Test,
    Homework,
    Project,
    Participation,
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Quiz => "Quiz",
            Category::Test => "Test",
            Category::Homework => "Homework",
            Category::Project => "Project",
            Category::Participation => "Participation",
            Category::Other(name) => name,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Quiz" => Category::Quiz,
            "Test" => Category::Test,
            "Homework" => Category::Homework,
            "Project" => Category::Project,
            "Participation" => Category::Participation,
            _ => Category::Other(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: RecordId,
    pub title: String,
    pub category: Category,
    /// Maximum point value; positive.
    pub points: f64,
    pub weight: f64,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: RecordId,
    pub student_id: RecordId,
    pub assignment_id: RecordId,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

/// Per-cell attendance state. `Unmarked` is the entry point of the editing
/// cycle and is never persisted: it is represented by the absence of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Unmarked,
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    /// The single transition used by interactive editing: one step forward
    /// through unmarked -> present -> absent -> late -> excused -> unmarked.
    pub fn next(self) -> Self {
        match self {
            AttendanceStatus::Unmarked => AttendanceStatus::Present,
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Late,
            AttendanceStatus::Late => AttendanceStatus::Excused,
            AttendanceStatus::Excused => AttendanceStatus::Unmarked,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Unmarked => "unmarked",
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Excused => "excused",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unmarked" => Some(AttendanceStatus::Unmarked),
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "late" => Some(AttendanceStatus::Late),
            "excused" => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }

    pub fn is_marked(self) -> bool {
        !matches!(self, AttendanceStatus::Unmarked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub student_id: RecordId,
    /// Day granularity; datetime inputs are normalized at the boundary.
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
