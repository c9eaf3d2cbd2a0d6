use crate::model::{
    Assignment, AttendanceRecord, AttendanceStatus, Category, Grade, RecordId, Student,
};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Query,
    Insert,
    Update,
    Delete,
}

impl StoreOp {
    pub fn error_code(self) -> &'static str {
        match self {
            StoreOp::Query => "db_query_failed",
            StoreOp::Insert => "db_insert_failed",
            StoreOp::Update => "db_update_failed",
            StoreOp::Delete => "db_delete_failed",
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    NotFound { entity: &'static str, id: RecordId },
    Backend { op: StoreOp, message: String },
}

impl StoreError {
    fn backend(op: StoreOp, e: impl fmt::Display) -> Self {
        StoreError::Backend {
            op,
            message: e.to_string(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            StoreError::Backend { message, .. } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for StoreError {}

/// The record-store capability contract, one instance per entity collection.
/// Any conforming implementation may back the daemon; the product uses the
/// SQLite collections below, unit tests use an in-memory double.
pub trait Records {
    type Entity;
    type Fields;

    fn get_all(&self) -> Result<Vec<Self::Entity>, StoreError>;
    fn get_by_id(&self, id: RecordId) -> Result<Self::Entity, StoreError>;
    /// Id is allocated by the store: max existing id + 1, or 1 when empty.
    fn create(&self, fields: Self::Fields) -> Result<Self::Entity, StoreError>;
    fn update(&self, id: RecordId, fields: Self::Fields) -> Result<Self::Entity, StoreError>;
    fn delete(&self, id: RecordId) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone)]
pub struct StudentFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_no: String,
    pub grade_level: String,
    pub photo_url: Option<String>,
    pub marks: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AssignmentFields {
    pub title: String,
    pub category: Category,
    pub points: f64,
    pub weight: f64,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct GradeFields {
    pub student_id: RecordId,
    pub assignment_id: RecordId,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AttendanceFields {
    pub student_id: RecordId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
}

fn fmt_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| StoreError::backend(StoreOp::Query, format!("bad date {:?}: {}", raw, e)))
}

fn fmt_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::backend(StoreOp::Query, format!("bad timestamp {:?}: {}", raw, e))
        })
}

fn parse_status(raw: &str) -> Result<AttendanceStatus, StoreError> {
    AttendanceStatus::parse(raw)
        .filter(|s| s.is_marked())
        .ok_or_else(|| {
            StoreError::backend(StoreOp::Query, format!("bad attendance status {:?}", raw))
        })
}

pub struct SqliteStudents<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStudents<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn student_from_row(r: &Row) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        first_name: r.get(1)?,
        last_name: r.get(2)?,
        email: r.get(3)?,
        student_no: r.get(4)?,
        grade_level: r.get(5)?,
        photo_url: r.get(6)?,
        marks: r.get(7)?,
    })
}

const STUDENT_COLS: &str = "id, first_name, last_name, email, student_no, grade_level, photo_url, marks";

impl Records for SqliteStudents<'_> {
    type Entity = Student;
    type Fields = StudentFields;

    fn get_all(&self) -> Result<Vec<Student>, StoreError> {
        let sql = format!("SELECT {} FROM students ORDER BY id", STUDENT_COLS);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?;
        stmt.query_map([], student_from_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(|e| StoreError::backend(StoreOp::Query, e))
    }

    fn get_by_id(&self, id: RecordId) -> Result<Student, StoreError> {
        let sql = format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLS);
        self.conn
            .query_row(&sql, [id], student_from_row)
            .optional()
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?
            .ok_or(StoreError::NotFound {
                entity: "student",
                id,
            })
    }

    fn create(&self, f: StudentFields) -> Result<Student, StoreError> {
        self.conn
            .execute(
                "INSERT INTO students(id, first_name, last_name, email, student_no, grade_level, photo_url, marks)
                 VALUES((SELECT COALESCE(MAX(id), 0) + 1 FROM students), ?, ?, ?, ?, ?, ?, ?)",
                (
                    &f.first_name,
                    &f.last_name,
                    &f.email,
                    &f.student_no,
                    &f.grade_level,
                    f.photo_url.as_deref(),
                    f.marks,
                ),
            )
            .map_err(|e| StoreError::backend(StoreOp::Insert, e))?;
        self.get_by_id(self.conn.last_insert_rowid())
    }

    fn update(&self, id: RecordId, f: StudentFields) -> Result<Student, StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE students
                 SET first_name = ?, last_name = ?, email = ?, student_no = ?,
                     grade_level = ?, photo_url = ?, marks = ?
                 WHERE id = ?",
                (
                    &f.first_name,
                    &f.last_name,
                    &f.email,
                    &f.student_no,
                    &f.grade_level,
                    f.photo_url.as_deref(),
                    f.marks,
                    id,
                ),
            )
            .map_err(|e| StoreError::backend(StoreOp::Update, e))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "student",
                id,
            });
        }
        self.get_by_id(id)
    }

    fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        // No cascade: grades and attendance rows referencing this student
        // are left dangling and resolve as "no match" in every reader.
        self.conn
            .execute("DELETE FROM students WHERE id = ?", [id])
            .map(|n| n > 0)
            .map_err(|e| StoreError::backend(StoreOp::Delete, e))
    }
}

pub struct SqliteAssignments<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteAssignments<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

type AssignmentParts = (RecordId, String, String, f64, f64, String);

fn assignment_parts(r: &Row) -> rusqlite::Result<AssignmentParts> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        r.get(2)?,
        r.get(3)?,
        r.get(4)?,
        r.get(5)?,
    ))
}

fn assignment_from_parts(parts: AssignmentParts) -> Result<Assignment, StoreError> {
    let (id, title, category, points, weight, due_date) = parts;
    Ok(Assignment {
        id,
        title,
        category: Category::from(category),
        points,
        weight,
        due_date: parse_date(&due_date)?,
    })
}

impl Records for SqliteAssignments<'_> {
    type Entity = Assignment;
    type Fields = AssignmentFields;

    fn get_all(&self) -> Result<Vec<Assignment>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, category, points, weight, due_date FROM assignments ORDER BY id")
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?;
        let parts = stmt
            .query_map([], assignment_parts)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?;
        parts.into_iter().map(assignment_from_parts).collect()
    }

    fn get_by_id(&self, id: RecordId) -> Result<Assignment, StoreError> {
        let parts = self
            .conn
            .query_row(
                "SELECT id, title, category, points, weight, due_date FROM assignments WHERE id = ?",
                [id],
                assignment_parts,
            )
            .optional()
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?
            .ok_or(StoreError::NotFound {
                entity: "assignment",
                id,
            })?;
        assignment_from_parts(parts)
    }

    fn create(&self, f: AssignmentFields) -> Result<Assignment, StoreError> {
        self.conn
            .execute(
                "INSERT INTO assignments(id, title, category, points, weight, due_date)
                 VALUES((SELECT COALESCE(MAX(id), 0) + 1 FROM assignments), ?, ?, ?, ?, ?)",
                (
                    &f.title,
                    f.category.as_str(),
                    f.points,
                    f.weight,
                    fmt_date(f.due_date),
                ),
            )
            .map_err(|e| StoreError::backend(StoreOp::Insert, e))?;
        self.get_by_id(self.conn.last_insert_rowid())
    }

    fn update(&self, id: RecordId, f: AssignmentFields) -> Result<Assignment, StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE assignments
                 SET title = ?, category = ?, points = ?, weight = ?, due_date = ?
                 WHERE id = ?",
                (
                    &f.title,
                    f.category.as_str(),
                    f.points,
                    f.weight,
                    fmt_date(f.due_date),
                    id,
                ),
            )
            .map_err(|e| StoreError::backend(StoreOp::Update, e))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "assignment",
                id,
            });
        }
        self.get_by_id(id)
    }

    fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        self.conn
            .execute("DELETE FROM assignments WHERE id = ?", [id])
            .map(|n| n > 0)
            .map_err(|e| StoreError::backend(StoreOp::Delete, e))
    }
}

pub struct SqliteGrades<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteGrades<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

type GradeParts = (RecordId, RecordId, RecordId, f64, String);

fn grade_parts(r: &Row) -> rusqlite::Result<GradeParts> {
    Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
}

fn grade_from_parts(parts: GradeParts) -> Result<Grade, StoreError> {
    let (id, student_id, assignment_id, score, submitted_at) = parts;
    Ok(Grade {
        id,
        student_id,
        assignment_id,
        score,
        submitted_at: parse_timestamp(&submitted_at)?,
    })
}

impl Records for SqliteGrades<'_> {
    type Entity = Grade;
    type Fields = GradeFields;

    fn get_all(&self) -> Result<Vec<Grade>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, student_id, assignment_id, score, submitted_at FROM grades ORDER BY id")
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?;
        let parts = stmt
            .query_map([], grade_parts)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?;
        parts.into_iter().map(grade_from_parts).collect()
    }

    fn get_by_id(&self, id: RecordId) -> Result<Grade, StoreError> {
        let parts = self
            .conn
            .query_row(
                "SELECT id, student_id, assignment_id, score, submitted_at FROM grades WHERE id = ?",
                [id],
                grade_parts,
            )
            .optional()
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?
            .ok_or(StoreError::NotFound { entity: "grade", id })?;
        grade_from_parts(parts)
    }

    fn create(&self, f: GradeFields) -> Result<Grade, StoreError> {
        self.conn
            .execute(
                "INSERT INTO grades(id, student_id, assignment_id, score, submitted_at)
                 VALUES((SELECT COALESCE(MAX(id), 0) + 1 FROM grades), ?, ?, ?, ?)",
                (
                    f.student_id,
                    f.assignment_id,
                    f.score,
                    fmt_timestamp(f.submitted_at),
                ),
            )
            .map_err(|e| StoreError::backend(StoreOp::Insert, e))?;
        self.get_by_id(self.conn.last_insert_rowid())
    }

    fn update(&self, id: RecordId, f: GradeFields) -> Result<Grade, StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE grades
                 SET student_id = ?, assignment_id = ?, score = ?, submitted_at = ?
                 WHERE id = ?",
                (
                    f.student_id,
                    f.assignment_id,
                    f.score,
                    fmt_timestamp(f.submitted_at),
                    id,
                ),
            )
            .map_err(|e| StoreError::backend(StoreOp::Update, e))?;
        if changed == 0 {
            return Err(StoreError::NotFound { entity: "grade", id });
        }
        self.get_by_id(id)
    }

    fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        self.conn
            .execute("DELETE FROM grades WHERE id = ?", [id])
            .map(|n| n > 0)
            .map_err(|e| StoreError::backend(StoreOp::Delete, e))
    }
}

pub struct SqliteAttendance<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteAttendance<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

type AttendanceParts = (RecordId, RecordId, String, String, Option<String>);

fn attendance_parts(r: &Row) -> rusqlite::Result<AttendanceParts> {
    Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
}

fn attendance_from_parts(parts: AttendanceParts) -> Result<AttendanceRecord, StoreError> {
    let (id, student_id, date, status, notes) = parts;
    Ok(AttendanceRecord {
        id,
        student_id,
        date: parse_date(&date)?,
        status: parse_status(&status)?,
        notes,
    })
}

fn reject_unmarked(status: AttendanceStatus, op: StoreOp) -> Result<(), StoreError> {
    if status.is_marked() {
        Ok(())
    } else {
        // Unmarked is the absence of a row; callers delete instead.
        Err(StoreError::backend(op, "unmarked is never persisted"))
    }
}

impl Records for SqliteAttendance<'_> {
    type Entity = AttendanceRecord;
    type Fields = AttendanceFields;

    fn get_all(&self) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, student_id, date, status, notes FROM attendance_records ORDER BY id")
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?;
        let parts = stmt
            .query_map([], attendance_parts)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?;
        parts.into_iter().map(attendance_from_parts).collect()
    }

    fn get_by_id(&self, id: RecordId) -> Result<AttendanceRecord, StoreError> {
        let parts = self
            .conn
            .query_row(
                "SELECT id, student_id, date, status, notes FROM attendance_records WHERE id = ?",
                [id],
                attendance_parts,
            )
            .optional()
            .map_err(|e| StoreError::backend(StoreOp::Query, e))?
            .ok_or(StoreError::NotFound {
                entity: "attendance record",
                id,
            })?;
        attendance_from_parts(parts)
    }

    fn create(&self, f: AttendanceFields) -> Result<AttendanceRecord, StoreError> {
        reject_unmarked(f.status, StoreOp::Insert)?;
        self.conn
            .execute(
                "INSERT INTO attendance_records(id, student_id, date, status, notes)
                 VALUES((SELECT COALESCE(MAX(id), 0) + 1 FROM attendance_records), ?, ?, ?, ?)",
                (
                    f.student_id,
                    fmt_date(f.date),
                    f.status.as_str(),
                    f.notes.as_deref(),
                ),
            )
            .map_err(|e| StoreError::backend(StoreOp::Insert, e))?;
        self.get_by_id(self.conn.last_insert_rowid())
    }

    fn update(&self, id: RecordId, f: AttendanceFields) -> Result<AttendanceRecord, StoreError> {
        reject_unmarked(f.status, StoreOp::Update)?;
        let changed = self
            .conn
            .execute(
                "UPDATE attendance_records
                 SET student_id = ?, date = ?, status = ?, notes = ?
                 WHERE id = ?",
                (
                    f.student_id,
                    fmt_date(f.date),
                    f.status.as_str(),
                    f.notes.as_deref(),
                    id,
                ),
            )
            .map_err(|e| StoreError::backend(StoreOp::Update, e))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "attendance record",
                id,
            });
        }
        self.get_by_id(id)
    }

    fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        self.conn
            .execute("DELETE FROM attendance_records WHERE id = ?", [id])
            .map(|n| n > 0)
            .map_err(|e| StoreError::backend(StoreOp::Delete, e))
    }
}
