use chrono::Local;
use serde_json::json;

use crate::ipc::helpers::{get_required_str, rejected, respond, session_result, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;
use crate::probability;
use crate::session::RollCallMode;

fn student_label(state: &AppState, student_id: &str) -> String {
    state
        .roster
        .student(student_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| student_id.to_string())
}

fn rollcall_start(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "mode")?;
    let mode = RollCallMode::parse(&raw)
        .ok_or_else(|| HandlerErr::new("bad_params", "mode must be sequential or random"))?;
    state
        .sessions
        .start_rollcall(mode, &mut state.roster)
        .map_err(|e| rejected("rollcall.start", e))?;
    let msg = match mode {
        RollCallMode::Sequential => "roll call started",
        RollCallMode::Random => "random roll call started",
    };
    Ok(session_result(state, json!({}), msg, "info", true))
}

fn rollcall_mark(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "status")?;
    let status = AttendanceStatus::parse(&raw)
        .filter(|s| s.is_outcome())
        .ok_or_else(|| HandlerErr::new("bad_params", "status must be present, late or absent"))?;
    let outcome = state
        .sessions
        .mark(status, &mut state.roster, Local::now())
        .map_err(|e| rejected("rollcall.mark", e))?;

    let name = student_label(state, &outcome.record.student_id);
    let (msg, severity) = if outcome.completed {
        ("roll call complete".to_string(), "success")
    } else {
        (format!("{} marked {}", name, status.as_str()), "info")
    };
    Ok(session_result(
        state,
        json!({ "record": outcome.record, "completed": outcome.completed }),
        msg,
        severity,
        true,
    ))
}

fn rollcall_draw_next(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let picked = state
        .sessions
        .draw_next_rollcall(&mut state.roster)
        .map_err(|e| rejected("rollcall.drawNext", e))?;
    let lucky = state
        .roster
        .student(&picked)
        .map(|s| probability::is_lucky(s.score))
        .unwrap_or(false);
    let name = student_label(state, &picked);
    let msg = if lucky {
        format!("lucky draw: {}", name)
    } else {
        format!("called {}", name)
    };
    Ok(session_result(state, json!({ "studentId": picked }), msg, "info", true))
}

fn rollcall_back(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let moved = state
        .sessions
        .back()
        .map_err(|e| rejected("rollcall.back", e))?;
    let (msg, severity) = if moved {
        ("moved back one student", "info")
    } else {
        ("already at the first student", "info")
    };
    Ok(session_result(state, json!({ "moved": moved }), msg, severity, false))
}

fn rollcall_back_from_completed(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state
        .sessions
        .back_from_completed()
        .map_err(|e| rejected("rollcall.backFromCompleted", e))?;
    Ok(session_result(state, json!({}), "back to the last student", "info", false))
}

fn rollcall_confirm(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state
        .sessions
        .confirm_completion()
        .map_err(|e| rejected("rollcall.confirm", e))?;
    log::info!("roll call confirmed");
    Ok(session_result(state, json!({}), "roll call saved", "success", true))
}

fn rollcall_cancel(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state
        .sessions
        .cancel()
        .map_err(|e| rejected("rollcall.cancel", e))?;
    log::info!("roll call cancelled");
    Ok(session_result(state, json!({}), "roll call cancelled", "info", false))
}

fn handle_snapshot(state: &mut AppState, req: &Request) -> serde_json::Value {
    let snapshot = state.sessions.snapshot(&state.roster);
    crate::ipc::error::ok(&req.id, json!({ "snapshot": snapshot }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "rollcall.start" => rollcall_start(state, &req.params),
        "rollcall.mark" => rollcall_mark(state, &req.params),
        "rollcall.drawNext" => rollcall_draw_next(state),
        "rollcall.back" => rollcall_back(state),
        "rollcall.backFromCompleted" => rollcall_back_from_completed(state),
        "rollcall.confirm" => rollcall_confirm(state),
        "rollcall.cancel" => rollcall_cancel(state),
        "rollcall.snapshot" => return Some(handle_snapshot(state, req)),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
