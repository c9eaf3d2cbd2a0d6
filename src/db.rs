use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "classroom.sqlite3";

/// Grade and attendance rows reference students by plain integer id with no
/// FOREIGN KEY on purpose: removing a student must not cascade, and readers
/// resolve a dangling reference as "no match".
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS students(
    id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    student_no TEXT NOT NULL,
    grade_level TEXT NOT NULL,
    photo_url TEXT,
    marks REAL
);

CREATE TABLE IF NOT EXISTS assignments(
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    points REAL NOT NULL,
    weight REAL NOT NULL DEFAULT 1,
    due_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS grades(
    id INTEGER PRIMARY KEY,
    student_id INTEGER NOT NULL,
    assignment_id INTEGER NOT NULL,
    score REAL NOT NULL,
    submitted_at TEXT NOT NULL,
    UNIQUE(student_id, assignment_id)
);
CREATE INDEX IF NOT EXISTS idx_grades_student ON grades(student_id);
CREATE INDEX IF NOT EXISTS idx_grades_assignment ON grades(assignment_id);

CREATE TABLE IF NOT EXISTS attendance_records(
    id INTEGER PRIMARY KEY,
    student_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL,
    notes TEXT,
    UNIQUE(student_id, date)
);
CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance_records(student_id);
CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance_records(date);
";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.display()))?;
    let conn = Connection::open(workspace.join(DB_FILE))
        .with_context(|| format!("failed to open {} in workspace", DB_FILE))?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Idempotent schema setup, shared by the workspace path and the in-memory
/// connections used in tests.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(SCHEMA)
        .context("failed to initialize workspace schema")?;
    // Early workspaces stored attendance without the notes column.
    ensure_attendance_notes(conn)?;
    Ok(())
}

fn ensure_attendance_notes(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "attendance_records", "notes")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE attendance_records ADD COLUMN notes TEXT", [])
        .context("failed to add attendance notes column")?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
