use crate::ipc::helpers::{class_param, get_opt_usize, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::ranking::{self, DEFAULT_PAGE_SIZE};
use serde_json::json;

fn ranking_list(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = class_param(state, params)?;
    let rows = ranking::class_ranking(&state.roster, &class_id);

    let page = get_opt_usize(params, "page")?;
    let page_size = get_opt_usize(params, "pageSize")?;
    if page.is_none() && page_size.is_none() {
        return Ok(json!({ "classId": class_id, "rows": rows }));
    }
    let page = ranking::paginate(
        rows,
        page.unwrap_or(1),
        page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    let mut result = json!(page);
    result["classId"] = json!(class_id);
    Ok(result)
}

fn handle_ranking_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, ranking_list(state, &req.params))
}

fn attendance_stats(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = class_param(state, params)?;
    let stats = ranking::attendance_stats(&state.roster, &class_id);
    let mut result = json!(stats);
    result["classId"] = json!(class_id);
    Ok(result)
}

fn handle_attendance_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, attendance_stats(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ranking.list" => Some(handle_ranking_list(state, req)),
        "attendance.stats" => Some(handle_attendance_stats(state, req)),
        _ => None,
    }
}
