use crate::ipc::helpers::{
    get_opt_str, get_required_str, persisted, require_workspace, respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::roster::StudentPatch;
use serde_json::json;

fn students_list(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if state.roster.class(&class_id).is_none() {
        return Err(HandlerErr::new("not_found", "class not found"));
    }
    let students = state.roster.students_in_class(&class_id);
    Ok(json!({ "classId": class_id, "students": students }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, students_list(state, &req.params))
}

fn students_create(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let class_id = get_required_str(params, "classId")?;
    let name = get_required_str(params, "name")?;
    let external_id = get_required_str(params, "externalId")?;
    let student = state.roster.create_student(&class_id, &name, &external_id)?;
    let msg = format!("{} added", student.name);
    Ok(persisted(state, json!({ "student": student }), msg, "success"))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, students_create(state, &req.params))
}

fn students_update(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let student_id = get_required_str(params, "studentId")?;
    let patch = StudentPatch {
        name: get_opt_str(params, "name"),
        external_id: get_opt_str(params, "externalId"),
        class_id: get_opt_str(params, "classId"),
    };
    let previous_class = state
        .roster
        .student(&student_id)
        .map(|s| s.class_id.clone());
    let student = state.roster.update_student(&student_id, patch)?;
    if previous_class.as_deref() != Some(student.class_id.as_str()) {
        // Moved out of the class any running session was built from.
        state.sessions.on_student_removed(&student_id);
    }
    let mut result = persisted(state, json!({ "student": student }), "student updated", "success");
    result["snapshot"] = json!(state.sessions.snapshot(&state.roster));
    Ok(result)
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, students_update(state, &req.params))
}

fn students_delete(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let student_id = get_required_str(params, "studentId")?;
    let student = state.roster.delete_student(&student_id)?;
    state.sessions.on_student_removed(&student_id);
    log::info!("student deleted: {} ({})", student.name, student.id);
    let msg = format!("{} removed", student.name);
    let mut result = persisted(state, json!({ "studentId": student_id }), msg, "success");
    result["snapshot"] = json!(state.sessions.snapshot(&state.roster));
    Ok(result)
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, students_delete(state, &req.params))
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
