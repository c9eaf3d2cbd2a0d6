use crate::ipc::params::{get_required_day, get_required_id, get_required_str};
use crate::ipc::reply::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::Category;
use crate::store::{AssignmentFields, Records, SqliteAssignments};
use serde_json::json;

fn parse_assignment_fields(params: &serde_json::Value) -> Result<AssignmentFields, HandlerErr> {
    let title = get_required_str(params, "title")?.trim().to_string();
    if title.is_empty() {
        return Err(HandlerErr::new("bad_params", "title must not be empty"));
    }
    let category = Category::from(get_required_str(params, "category")?);

    let points = params
        .get("points")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing points"))?;
    if !points.is_finite() || points <= 0.0 {
        return Err(
            HandlerErr::new("bad_params", "points must be a positive number")
                .with_details(json!({ "points": points })),
        );
    }

    let weight = match params.get("weight") {
        None => 1.0,
        Some(v) if v.is_null() => 1.0,
        Some(v) => {
            let Some(w) = v.as_f64() else {
                return Err(HandlerErr::new("bad_params", "weight must be numeric"));
            };
            if !w.is_finite() || w <= 0.0 {
                return Err(
                    HandlerErr::new("bad_params", "weight must be a positive number")
                        .with_details(json!({ "weight": w })),
                );
            }
            w
        }
    };

    Ok(AssignmentFields {
        title,
        category,
        points,
        weight,
        due_date: get_required_day(params, "dueDate")?,
    })
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "assignments": [] }));
    };
    match SqliteAssignments::new(conn).get_all() {
        Ok(assignments) => ok(&req.id, json!({ "assignments": assignments })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let fields = match parse_assignment_fields(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match SqliteAssignments::new(conn).create(fields) {
        Ok(assignment) => ok(&req.id, json!({ "assignment": assignment })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_assignments_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let assignment_id = match get_required_id(&req.params, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let fields = match parse_assignment_fields(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match SqliteAssignments::new(conn).update(assignment_id, fields) {
        Ok(assignment) => ok(&req.id, json!({ "assignment": assignment })),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let assignment_id = match get_required_id(&req.params, "assignmentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match SqliteAssignments::new(conn).delete(assignment_id) {
        Ok(true) => ok(&req.id, json!({ "ok": true })),
        Ok(false) => err(&req.id, "not_found", "assignment not found", None),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "assignments.update" => Some(handle_assignments_update(state, req)),
        "assignments.delete" => Some(handle_assignments_delete(state, req)),
        _ => None,
    }
}
