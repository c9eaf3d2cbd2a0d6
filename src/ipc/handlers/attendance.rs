use crate::calendar::{self, AttendanceSheet, StatusChange};
use crate::ipc::params::{
    get_opt_trimmed_str, get_required_day, get_required_id, get_required_str,
};
use crate::ipc::reply::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceRecord, AttendanceStatus, RecordId};
use crate::store::{AttendanceFields, Records, SqliteAttendance, SqliteStudents};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;

fn week_open(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let reference = get_required_day(params, "referenceDate")?;
    let days = calendar::weekdays_of(reference);

    let students = SqliteStudents::new(conn).get_all()?;
    let records = SqliteAttendance::new(conn).get_all()?;
    let sheet = AttendanceSheet::index(&records);

    let rows: Vec<serde_json::Value> = students
        .iter()
        .map(|s| {
            let statuses: Vec<&str> = days
                .iter()
                .map(|d| sheet.status_of(s.id, *d).as_str())
                .collect();
            json!({
                "studentId": s.id,
                "displayName": s.display_name(),
                "statuses": statuses
            })
        })
        .collect();

    Ok(json!({
        "weekStart": days[0],
        "days": days.to_vec(),
        "students": students,
        "rows": rows
    }))
}

/// Executes a planned status change against the store. The whole change is a
/// single row operation, so a persistence failure leaves the collection
/// untouched and surfaces to the caller.
fn execute_status_change(
    conn: &Connection,
    records: &[AttendanceRecord],
    student_id: RecordId,
    date: NaiveDate,
    new_status: AttendanceStatus,
    notes: Option<String>,
) -> Result<(), HandlerErr> {
    let store = SqliteAttendance::new(conn);
    match calendar::plan_status_change(records, student_id, date, new_status) {
        StatusChange::Remove(id) => {
            store.delete(id)?;
        }
        StatusChange::Replace(id, status) => {
            let kept_notes = notes.or_else(|| {
                calendar::find_record(records, student_id, date).and_then(|r| r.notes.clone())
            });
            store.update(
                id,
                AttendanceFields {
                    student_id,
                    date,
                    status,
                    notes: kept_notes,
                },
            )?;
        }
        StatusChange::Insert(r) => {
            store.create(AttendanceFields {
                student_id: r.student_id,
                date: r.date,
                status: r.status,
                notes,
            })?;
        }
        StatusChange::Noop => {}
    }
    Ok(())
}

fn set_status(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let date = get_required_day(params, "date")?;
    let raw_status = get_required_str(params, "status")?;
    let Some(new_status) = AttendanceStatus::parse(&raw_status) else {
        return Err(HandlerErr::new(
            "bad_params",
            "status must be one of: unmarked, present, absent, late, excused",
        )
        .with_details(json!({ "status": raw_status })));
    };
    let notes = get_opt_trimmed_str(params, "notes");

    SqliteStudents::new(conn).get_by_id(student_id)?;
    let records = SqliteAttendance::new(conn).get_all()?;
    execute_status_change(conn, &records, student_id, date, new_status, notes)?;

    // Report the refreshed cell off the pure collection op: a removal reads
    // back as unmarked.
    let updated = calendar::apply_status_change(&records, student_id, date, new_status);
    let sheet = AttendanceSheet::index(&updated);
    Ok(json!({ "status": sheet.status_of(student_id, date).as_str() }))
}

fn cycle_day(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let date = get_required_day(params, "date")?;

    SqliteStudents::new(conn).get_by_id(student_id)?;
    let records = SqliteAttendance::new(conn).get_all()?;

    let current = calendar::find_record(&records, student_id, date)
        .map_or(AttendanceStatus::Unmarked, |r| r.status);
    let next = current.next();
    execute_status_change(conn, &records, student_id, date, next, None)?;

    let updated = calendar::apply_status_change(&records, student_id, date, next);
    let sheet = AttendanceSheet::index(&updated);
    Ok(json!({
        "previous": current.as_str(),
        "status": sheet.status_of(student_id, date).as_str()
    }))
}

fn handle_attendance_week_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match week_open(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_attendance_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match set_status(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_attendance_cycle_day(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match cycle_day(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.weekOpen" => Some(handle_attendance_week_open(state, req)),
        "attendance.setStatus" => Some(handle_attendance_set_status(state, req)),
        "attendance.cycleDay" => Some(handle_attendance_cycle_day(state, req)),
        _ => None,
    }
}
