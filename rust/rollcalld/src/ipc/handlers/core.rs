use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, persisted, require_workspace, respond, HandlerErr};
use crate::ipc::types::{AppState, Request, SaveOutcome};
use crate::legacy;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let last_saved = state
        .store
        .as_ref()
        .and_then(|s| s.last_saved().ok().flatten());
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "lastSaved": last_saved,
            "focus": state.sessions.snapshot(&state.roster).focus,
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match state.open_workspace(&path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "classCount": state.roster.classes.len(),
                "studentCount": state.roster.students.len(),
            }),
        ),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_workspace_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_workspace(state) {
        return e.response(&req.id);
    }
    match state.persist() {
        SaveOutcome::Saved => {
            log::info!("workspace saved");
            ok(&req.id, json!({ "saved": true }))
        }
        SaveOutcome::Failed(msg) => err(&req.id, "save_failed", msg, None),
        SaveOutcome::NoWorkspace => err(&req.id, "no_workspace", "select a workspace first", None),
    }
}

fn import_legacy_json(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let path = PathBuf::from(get_required_str(params, "path")?);
    let imported = legacy::read_legacy_dump(&path)
        .map_err(|e| HandlerErr::new("import_failed", format!("{e:#}")))?;

    state.roster = imported.roster;
    state.sessions.reset();
    state.sessions.select_class(None);
    log::info!(
        "legacy import: {} classes, {} students, {} records; skipped {}/{}/{}, re-keyed {}",
        state.roster.classes.len(),
        state.roster.students.len(),
        state.roster.attendance_records.len(),
        imported.skipped_classes,
        imported.skipped_students,
        imported.skipped_records,
        imported.rekeyed_records
    );

    let result = json!({
        "classes": state.roster.classes.len(),
        "students": state.roster.students.len(),
        "records": state.roster.attendance_records.len(),
        "skippedClasses": imported.skipped_classes,
        "skippedStudents": imported.skipped_students,
        "skippedRecords": imported.skipped_records,
        "rekeyedRecords": imported.rekeyed_records,
    });
    Ok(persisted(state, result, "legacy data imported", "success"))
}

fn handle_import_legacy_json(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, import_legacy_json(state, &req.params))
}

fn backup_export(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let out_path = PathBuf::from(get_required_str(params, "outPath")?);
    // The bundle copies the database file, so flush the roster first.
    if let SaveOutcome::Failed(msg) = state.persist() {
        return Err(HandlerErr::new("save_failed", msg));
    }
    let Some(workspace) = state.workspace.clone() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let summary = backup::export_workspace_bundle(&workspace, &out_path)
        .map_err(|e| HandlerErr::new("io_failed", format!("{e:#}")))?;
    log::info!("backup exported to {}", out_path.to_string_lossy());
    Ok(json!({
        "outPath": out_path.to_string_lossy(),
        "bundleFormat": summary.bundle_format,
        "dbSha256": summary.db_sha256,
    }))
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, backup_export(state, &req.params))
}

fn backup_import(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let in_path = PathBuf::from(get_required_str(params, "inPath")?);
    let Some(workspace) = state.workspace.clone() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };

    state.close_workspace();
    let imported = backup::import_workspace_bundle(&in_path, &workspace);
    // Reopen whatever is on disk now, restored or not.
    let reopened = state.open_workspace(&workspace);

    let summary = imported.map_err(|e| HandlerErr::new("import_failed", format!("{e:#}")))?;
    reopened.map_err(|e| HandlerErr::new("db_open_failed", format!("{e:?}")))?;
    log::info!("backup restored from {}", in_path.to_string_lossy());
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "dbSha256": summary.db_sha256,
        "classCount": state.roster.classes.len(),
        "studentCount": state.roster.students.len(),
    }))
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, backup_import(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.save" => Some(handle_workspace_save(state, req)),
        "workspace.importLegacyJson" => Some(handle_import_legacy_json(state, req)),
        "workspace.backupExport" => Some(handle_backup_export(state, req)),
        "workspace.backupImport" => Some(handle_backup_import(state, req)),
        _ => None,
    }
}
