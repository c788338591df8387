use serde_json::json;

use crate::error::CoreError;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, SaveOutcome};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<CoreError> for HandlerErr {
    fn from(e: CoreError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => crate::ipc::error::ok(id, v),
        Err(e) => e.response(id),
    }
}

/// Session operations refused by the state machine are worth a log line.
pub fn rejected(method: &str, e: CoreError) -> HandlerErr {
    log::warn!("{} rejected: {}", method, e);
    e.into()
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_opt_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn get_opt_usize(params: &serde_json::Value, key: &str) -> Result<Option<usize>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| {
                HandlerErr::new(
                    "bad_params",
                    format!("{} must be a non-negative integer", key),
                )
            }),
    }
}

pub fn require_workspace(state: &AppState) -> Result<(), HandlerErr> {
    if state.store.is_none() {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    }
    Ok(())
}

/// `classId` from params, else the selected class.
pub fn class_param(state: &AppState, params: &serde_json::Value) -> Result<String, HandlerErr> {
    let class_id = get_opt_str(params, "classId")
        .or_else(|| state.sessions.current_class().map(str::to_string))
        .ok_or_else(|| HandlerErr::new("bad_params", "missing classId"))?;
    if state.roster.class(&class_id).is_none() {
        return Err(HandlerErr::new("not_found", "class not found"));
    }
    Ok(class_id)
}

pub fn notice(message: impl Into<String>, severity: &str) -> serde_json::Value {
    json!({ "message": message.into(), "severity": severity })
}

/// Save after a mutation and attach `saved` plus a notice. A failed save
/// does not fail the call; the notice carries the error instead.
pub fn persisted(
    state: &mut AppState,
    mut result: serde_json::Value,
    message: impl Into<String>,
    severity: &str,
) -> serde_json::Value {
    let (saved, note) = match state.persist() {
        SaveOutcome::Saved => (true, notice(message, severity)),
        SaveOutcome::NoWorkspace => (false, notice(message, severity)),
        SaveOutcome::Failed(e) => (false, notice(format!("save failed: {}", e), "error")),
    };
    if !result.is_object() {
        result = json!({});
    }
    result["saved"] = json!(saved);
    result["notice"] = note;
    result
}

/// Snapshot-bearing result for session calls; `save` when the roster changed.
pub fn session_result(
    state: &mut AppState,
    extra: serde_json::Value,
    message: impl Into<String>,
    severity: &str,
    save: bool,
) -> serde_json::Value {
    let mut result = if save {
        persisted(state, extra, message, severity)
    } else {
        let mut r = if extra.is_object() { extra } else { json!({}) };
        r["notice"] = notice(message, severity);
        r
    };
    result["snapshot"] = json!(state.sessions.snapshot(&state.roster));
    result
}
