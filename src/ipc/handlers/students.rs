use crate::ipc::params::{get_opt_trimmed_str, get_required_id, get_required_str};
use crate::ipc::reply::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{Records, SqliteStudents, StudentFields};
use serde_json::json;

fn parse_student_fields(params: &serde_json::Value) -> Result<StudentFields, HandlerErr> {
    let first_name = get_required_str(params, "firstName")?.trim().to_string();
    let last_name = get_required_str(params, "lastName")?.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(HandlerErr::new(
            "bad_params",
            "firstName/lastName must not be empty",
        ));
    }
    Ok(StudentFields {
        first_name,
        last_name,
        email: get_opt_trimmed_str(params, "email").unwrap_or_default(),
        student_no: get_opt_trimmed_str(params, "studentNo").unwrap_or_default(),
        grade_level: get_opt_trimmed_str(params, "gradeLevel").unwrap_or_default(),
        photo_url: get_opt_trimmed_str(params, "photoUrl"),
        marks: params.get("marks").and_then(|v| v.as_f64()),
    })
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    match SqliteStudents::new(conn).get_all() {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let fields = match parse_student_fields(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match SqliteStudents::new(conn).create(fields) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match get_required_id(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let fields = match parse_student_fields(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match SqliteStudents::new(conn).update(student_id, fields) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match get_required_id(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    // Grades and attendance rows are left in place; readers resolve the
    // dangling references as "no match".
    match SqliteStudents::new(conn).delete(student_id) {
        Ok(true) => ok(&req.id, json!({ "ok": true })),
        Ok(false) => err(&req.id, "not_found", "student not found", None),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
