mod backup;
mod config;
mod db;
mod error;
mod ipc;
mod legacy;
mod model;
mod probability;
mod ranking;
mod roster;
mod scoring;
mod selector;
mod session;

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use env_logger::Env;

/// Upper bound on a wait when nothing is scheduled.
const IDLE_WAIT: Duration = Duration::from_secs(60);

fn write_response(stdout: &mut io::Stdout, resp: &serde_json::Value) {
    let _ = writeln!(
        stdout,
        "{}",
        serde_json::to_string(resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
    );
    let _ = stdout.flush();
}

fn handle_line(state: &mut ipc::AppState, stdout: &mut io::Stdout, line: &str) {
    if line.trim().is_empty() {
        return;
    }
    let req: ipc::Request = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            // Can't reply without id.
            write_response(
                stdout,
                &serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                }),
            );
            return;
        }
    };
    log::debug!("request {} {}", req.id, req.method);
    let resp = ipc::handle_request(state, req);
    write_response(stdout, &resp);
}

/// Deferred work: question auto-end and periodic save.
fn tick(state: &mut ipc::AppState, now: Instant) {
    state.sessions.poll(now);
    if state.autosave_due(now) {
        log::debug!("autosave");
        state.persist();
    }
}

fn next_wakeup(state: &ipc::AppState, now: Instant) -> Duration {
    [state.next_autosave(), state.sessions.next_deadline()]
        .into_iter()
        .flatten()
        .min()
        .map(|at| at.saturating_duration_since(now))
        .unwrap_or(IDLE_WAIT)
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mut state = ipc::AppState::new(config.clone());
    if let Some(ws) = config.workspace.as_deref() {
        if let Err(e) = state.open_workspace(ws) {
            log::error!("failed to open workspace {}: {:#}", ws.to_string_lossy(), e);
        }
    }

    let (tx, rx) = mpsc::channel::<String>();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut stdout = io::stdout();
    loop {
        match rx.recv_timeout(next_wakeup(&state, Instant::now())) {
            Ok(line) => handle_line(&mut state, &mut stdout, &line),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        tick(&mut state, Instant::now());
    }

    if state.store.is_some() {
        state.persist();
    }
    log::info!("stdin closed, exiting");
}
