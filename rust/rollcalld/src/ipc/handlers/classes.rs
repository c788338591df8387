use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_opt_str, get_required_str, persisted, rejected, require_workspace, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.store.is_none() {
        return ok(&req.id, json!({ "classes": [], "currentClassId": null }));
    }

    // Counts let the UI show a useful dashboard.
    let classes: Vec<serde_json::Value> = state
        .roster
        .classes
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "description": c.description,
                "studentCount": state.roster.student_count(&c.id),
            })
        })
        .collect();
    ok(
        &req.id,
        json!({
            "classes": classes,
            "currentClassId": state.sessions.current_class(),
        }),
    )
}

fn classes_create(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let name = get_required_str(params, "name")?;
    let description = get_opt_str(params, "description");
    let class = state.roster.create_class(&name, description.as_deref())?;
    log::info!("class created: {} ({})", class.name, class.id);
    let msg = format!("class {} created", class.name);
    Ok(persisted(state, json!({ "class": class }), msg, "success"))
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_create(state, &req.params))
}

fn classes_update(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let class_id = get_required_str(params, "classId")?;
    let name = get_required_str(params, "name")?;
    let description = get_opt_str(params, "description");
    let class = state
        .roster
        .update_class(&class_id, &name, description.as_deref())?;
    Ok(persisted(state, json!({ "class": class }), "class updated", "success"))
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_update(state, &req.params))
}

fn classes_delete(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let class_id = get_required_str(params, "classId")?;
    let deleted = state.roster.delete_class(&class_id)?;
    state.sessions.on_class_deleted(&class_id);
    log::info!(
        "class deleted: {} ({} students, {} records)",
        deleted.class.id,
        deleted.student_ids.len(),
        deleted.record_count
    );

    let result = json!({
        "classId": class_id,
        "deletedStudents": deleted.student_ids.len(),
        "deletedRecords": deleted.record_count,
    });
    let msg = format!("class {} deleted", deleted.class.name);
    let mut result = persisted(state, result, msg, "success");
    result["snapshot"] = json!(state.sessions.snapshot(&state.roster));
    Ok(result)
}

fn handle_classes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_delete(state, &req.params))
}

/// `classId: null` clears the selection. Switching to another class ends
/// any session that belongs to the previous one.
fn classes_select(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let class_id = match params.get("classId") {
        None => return Err(HandlerErr::new("bad_params", "missing classId")),
        Some(serde_json::Value::Null) => None,
        Some(v) => Some(
            v.as_str()
                .ok_or_else(|| HandlerErr::new("bad_params", "classId must be a string or null"))?
                .to_string(),
        ),
    };
    if let Some(id) = class_id.as_deref() {
        if state.roster.class(id).is_none() {
            return Err(HandlerErr::new("not_found", "class not found"));
        }
    }
    if state.sessions.current_class() != class_id.as_deref() {
        state.sessions.reset();
    }
    state.sessions.select_class(class_id);
    Ok(json!({ "snapshot": state.sessions.snapshot(&state.roster) }))
}

fn handle_classes_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_select(state, &req.params))
}

fn classes_reset_data(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let class_id = get_required_str(params, "classId")?;
    let count = state
        .roster
        .reset_class_data(&class_id)
        .map_err(|e| rejected("classes.resetData", e))?;
    state.sessions.reset();
    log::info!("class data reset: {} ({} students)", class_id, count);

    let mut result = persisted(
        state,
        json!({ "classId": class_id, "studentsReset": count }),
        "class data reset",
        "success",
    );
    result["snapshot"] = json!(state.sessions.snapshot(&state.roster));
    Ok(result)
}

fn handle_classes_reset_data(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, classes_reset_data(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        "classes.delete" => Some(handle_classes_delete(state, req)),
        "classes.select" => Some(handle_classes_select(state, req)),
        "classes.resetData" => Some(handle_classes_reset_data(state, req)),
        _ => None,
    }
}
