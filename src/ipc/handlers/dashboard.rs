use crate::calc::round1;
use crate::ipc::params::get_required_day;
use crate::ipc::reply::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::store::{Records, SqliteAssignments, SqliteAttendance, SqliteGrades, SqliteStudents};
use crate::summary;
use chrono::Local;
use rusqlite::Connection;
use serde_json::json;

fn open_dashboard(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let today = if params.get("today").is_some() {
        get_required_day(params, "today")?
    } else {
        Local::now().date_naive()
    };

    let students = SqliteStudents::new(conn).get_all()?;
    let assignments = SqliteAssignments::new(conn).get_all()?;
    let grades = SqliteGrades::new(conn).get_all()?;
    let records = SqliteAttendance::new(conn).get_all()?;

    let present_today = summary::status_count(&records, today, AttendanceStatus::Present);
    let recent: Vec<serde_json::Value> = summary::recent_grades(&grades, 5)
        .into_iter()
        .map(|g| {
            // Dangling references render as nulls, never errors.
            let student = students.iter().find(|s| s.id == g.student_id);
            let assignment = assignments.iter().find(|a| a.id == g.assignment_id);
            let percent = assignment.map(|a| {
                if a.points > 0.0 {
                    round1(100.0 * g.score / a.points)
                } else {
                    0.0
                }
            });
            json!({
                "grade": g,
                "studentName": student.map(|s| s.display_name()),
                "assignmentTitle": assignment.map(|a| a.title.clone()),
                "points": assignment.map(|a| a.points),
                "percent": percent
            })
        })
        .collect();

    Ok(json!({
        "today": today,
        "totalStudents": students.len(),
        "presentToday": present_today,
        "absentToday": summary::status_count(&records, today, AttendanceStatus::Absent),
        "lateToday": summary::status_count(&records, today, AttendanceStatus::Late),
        "excusedToday": summary::status_count(&records, today, AttendanceStatus::Excused),
        "attendanceRate": summary::attendance_rate_today(&students, &records, today),
        "assignmentCount": assignments.len(),
        "gradeCount": grades.len(),
        "classAverage": round1(summary::class_average(&assignments, &grades)),
        "recentGrades": recent
    }))
}

fn handle_dashboard_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match open_dashboard(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.open" => Some(handle_dashboard_open(state, req)),
        _ => None,
    }
}
