use crate::calc::{self, letter_grade, round1, GradeBook, GradeUpsert};
use crate::ipc::params::{get_opt_trimmed_str, get_required_id};
use crate::ipc::reply::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::Assignment;
use crate::store::{GradeFields, Records, SqliteAssignments, SqliteGrades, SqliteStudents};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;

fn open_gradebook(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let students = SqliteStudents::new(conn).get_all()?;
    let all_assignments = SqliteAssignments::new(conn).get_all()?;
    let grades = SqliteGrades::new(conn).get_all()?;

    let category = get_opt_trimmed_str(params, "category").filter(|c| c != "all");
    let assignments: Vec<Assignment> = match category {
        Some(ref wanted) => all_assignments
            .iter()
            .filter(|a| a.category.as_str() == wanted)
            .cloned()
            .collect(),
        None => all_assignments.clone(),
    };

    let book = GradeBook::index(&grades);

    let rows: Vec<serde_json::Value> = students
        .iter()
        .map(|s| {
            let cells: Vec<serde_json::Value> = assignments
                .iter()
                .map(|a| match book.find(s.id, a.id) {
                    Some(g) => json!({
                        "assignmentId": a.id,
                        "score": g.score,
                        "letter": letter_grade(g.score, a.points).as_str()
                    }),
                    None => json!({
                        "assignmentId": a.id,
                        "score": null,
                        "letter": null
                    }),
                })
                .collect();
            json!({
                "studentId": s.id,
                "displayName": s.display_name(),
                "cells": cells,
                "average": round1(book.student_average(&assignments, s.id))
            })
        })
        .collect();

    let class_averages: Vec<serde_json::Value> = assignments
        .iter()
        .map(|a| {
            json!({
                "assignmentId": a.id,
                "avgPercent": round1(calc::class_average_for_assignment(
                    &all_assignments,
                    &grades,
                    a.id
                ))
            })
        })
        .collect();

    Ok(json!({
        "students": students,
        "assignments": assignments,
        "rows": rows,
        "classAverages": class_averages
    }))
}

fn update_cell(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_id(params, "studentId")?;
    let assignment_id = get_required_id(params, "assignmentId")?;
    // Missing or non-numeric scores coerce to 0; editing never rejects.
    let score = params.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0);

    SqliteStudents::new(conn).get_by_id(student_id)?;
    let assignment = SqliteAssignments::new(conn).get_by_id(assignment_id)?;

    let grades_store = SqliteGrades::new(conn);
    let grades = grades_store.get_all()?;
    let now = Utc::now();

    let stored = match calc::plan_upsert(&grades, student_id, assignment_id, score, now) {
        GradeUpsert::Update {
            id,
            score,
            submitted_at,
        } => grades_store.update(
            id,
            GradeFields {
                student_id,
                assignment_id,
                score,
                submitted_at,
            },
        )?,
        GradeUpsert::Insert(g) => grades_store.create(GradeFields {
            student_id: g.student_id,
            assignment_id: g.assignment_id,
            score: g.score,
            submitted_at: g.submitted_at,
        })?,
    };

    // Derived values come off the pure collection op, not a re-read.
    let assignments = SqliteAssignments::new(conn).get_all()?;
    let updated = calc::upsert_grade(&grades, student_id, assignment_id, score, now);
    let book = GradeBook::index(&updated);

    Ok(json!({
        "grade": stored,
        "letter": letter_grade(stored.score, assignment.points).as_str(),
        "studentAverage": round1(book.student_average(&assignments, student_id))
    }))
}

fn handle_gradebook_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match open_gradebook(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

fn handle_gradebook_update_cell(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match update_cell(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gradebook.open" => Some(handle_gradebook_open(state, req)),
        "gradebook.updateCell" => Some(handle_gradebook_update_cell(state, req)),
        _ => None,
    }
}
