use std::time::Instant;

use serde_json::json;

use crate::ipc::helpers::{get_required_str, rejected, respond, session_result, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::scoring::{AnswerQuality, RepeatQuality};
use crate::session::ScoreOutcome;

fn current_name(state: &AppState) -> String {
    state
        .sessions
        .question()
        .current()
        .and_then(|id| state.roster.student(id))
        .map(|s| s.name.clone())
        .unwrap_or_default()
}

fn question_start(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state
        .sessions
        .start_question(&state.roster)
        .map_err(|e| rejected("question.start", e))?;
    let msg = format!("question for {}", current_name(state));
    Ok(session_result(state, json!({}), msg, "info", false))
}

fn question_draw_next(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let picked = state
        .sessions
        .draw_next_question(&state.roster)
        .map_err(|e| rejected("question.drawNext", e))?;
    let msg = format!("question for {}", current_name(state));
    Ok(session_result(state, json!({ "studentId": picked }), msg, "info", false))
}

fn scored(state: &mut AppState, outcome: ScoreOutcome) -> serde_json::Value {
    let sign = if outcome.delta >= 0.0 { "+" } else { "" };
    let msg = format!("{}{} points, now {}", sign, outcome.delta, outcome.new_score);
    let severity = if outcome.delta >= 0.0 { "success" } else { "info" };
    session_result(
        state,
        json!({ "delta": outcome.delta, "newScore": outcome.new_score }),
        msg,
        severity,
        true,
    )
}

fn question_score_repeat(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_str(params, "quality")?;
    let quality = RepeatQuality::parse(&raw)
        .ok_or_else(|| HandlerErr::new("bad_params", "quality must be correct or incorrect"))?;
    let outcome = state
        .sessions
        .score_repeat(quality, &mut state.roster, Instant::now())
        .map_err(|e| rejected("question.scoreRepeat", e))?;
    Ok(scored(state, outcome))
}

fn question_score_answer(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let points = params
        .get("points")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| HandlerErr::new("bad_params", "missing points"))?;
    let quality = AnswerQuality::new(points)?;
    let outcome = state
        .sessions
        .score_answer(quality, &mut state.roster, Instant::now())
        .map_err(|e| rejected("question.scoreAnswer", e))?;
    Ok(scored(state, outcome))
}

fn question_end(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    state.sessions.end_question();
    Ok(session_result(state, json!({}), "question session ended", "info", false))
}

fn handle_snapshot(state: &mut AppState, req: &Request) -> serde_json::Value {
    let snapshot = state.sessions.snapshot(&state.roster);
    crate::ipc::error::ok(&req.id, json!({ "snapshot": snapshot }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "question.start" => question_start(state),
        "question.drawNext" => question_draw_next(state),
        "question.scoreRepeat" => question_score_repeat(state, &req.params),
        "question.scoreAnswer" => question_score_answer(state, &req.params),
        "question.end" => question_end(state),
        "question.snapshot" => return Some(handle_snapshot(state, req)),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
