use crate::backup;
use crate::db;
use crate::ipc::params::get_opt_trimmed_str;
use crate::ipc::reply::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{Records, SqliteAssignments, SqliteGrades, SqliteStudents};
use serde_json::json;
use std::path::PathBuf;

fn export(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let out_path = get_opt_trimmed_str(params, "outPath")
        .ok_or_else(|| HandlerErr::new("bad_params", "missing outPath"))?;
    let (Some(workspace), Some(conn)) = (state.workspace.as_ref(), state.db.as_ref()) else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };

    // Fold any WAL pages into the main file so the bundled copy is complete.
    let _ = conn.execute_batch("PRAGMA wal_checkpoint(FULL)");

    let students = SqliteStudents::new(conn).get_all()?;
    let assignments = SqliteAssignments::new(conn).get_all()?;
    let grades = SqliteGrades::new(conn).get_all()?;
    let data = backup::ExportData {
        students: &students,
        assignments: &assignments,
        grades: &grades,
    };

    let out = PathBuf::from(&out_path);
    let summary = backup::export_workspace_bundle(workspace, &data, &out).map_err(|e| {
        HandlerErr::new("io_failed", format!("{e:#}")).with_details(json!({ "path": out_path }))
    })?;

    Ok(json!({
        "ok": true,
        "path": out.to_string_lossy(),
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count
    }))
}

fn import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(in_path) = get_opt_trimmed_str(&req.params, "inPath") else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };
    let target = get_opt_trimmed_str(&req.params, "workspacePath")
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone());
    let Some(target) = target else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Release the open handle before the database file is swapped out.
    state.db = None;

    match backup::import_workspace_bundle(&src, &target) {
        Ok(summary) => match db::open_db(&target) {
            Ok(conn) => {
                state.workspace = Some(target);
                state.db = Some(conn);
                ok(
                    &req.id,
                    json!({
                        "ok": true,
                        "workspacePath": state.workspace_display(),
                        "bundleFormatDetected": summary.bundle_format_detected
                    }),
                )
            }
            Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
        },
        Err(e) => {
            // A rejected bundle leaves the old database intact; reattach it.
            if let Some(prev) = state.workspace.clone() {
                state.db = db::open_db(&prev).ok();
            }
            err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": in_path })),
            )
        }
    }
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    match export(state, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.export" => Some(handle_backup_export(state, req)),
        "backup.import" => Some(import(state, req)),
        _ => None,
    }
}
