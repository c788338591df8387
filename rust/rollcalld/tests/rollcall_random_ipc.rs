mod test_support;

use serde_json::json;
use std::collections::HashSet;
use test_support::{request_err, request_ok, seed_class, spawn_sidecar, temp_dir};

fn current_id(result: &serde_json::Value) -> String {
    result["snapshot"]["rollCall"]["current"]["id"]
        .as_str()
        .expect("current student")
        .to_string()
}

#[test]
fn random_roll_call_calls_everyone_once_then_runs_dry() {
    let workspace = temp_dir("rollcall-random");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _class_id = seed_class(&mut stdin, &mut reader, &workspace, &["Ann", "Bo", "Cy", "Di"]);

    let started = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rollcall.start",
        json!({ "mode": "random" }),
    );
    assert_eq!(started["snapshot"]["rollCall"]["mode"], "random");
    assert_eq!(started["snapshot"]["rollCall"]["uncalledCount"], 3);
    assert_eq!(started["snapshot"]["rollCall"]["cursor"], serde_json::Value::Null);

    let code = request_err(&mut stdin, &mut reader, "2", "rollcall.back", json!({}));
    assert_eq!(code, "invalid_state");

    let mut called = HashSet::new();
    called.insert(current_id(&started));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "rollcall.mark",
        json!({ "status": "present" }),
    );

    for i in 0..3 {
        let drawn = request_ok(
            &mut stdin,
            &mut reader,
            &format!("draw-{}", i),
            "rollcall.drawNext",
            json!({}),
        );
        let id = current_id(&drawn);
        assert_eq!(drawn["studentId"], id.as_str());
        assert!(called.insert(id), "student drawn twice");
        let marked = request_ok(
            &mut stdin,
            &mut reader,
            &format!("mark-{}", i),
            "rollcall.mark",
            json!({ "status": "absent" }),
        );
        // Random mode never completes on its own.
        assert_eq!(marked["completed"], false);
    }
    assert_eq!(called.len(), 4);

    let code = request_err(&mut stdin, &mut reader, "4", "rollcall.drawNext", json!({}));
    assert_eq!(code, "empty_candidate_set");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "rollcall.mark",
        json!({ "status": "late" }),
    );
    assert_eq!(code, "invalid_state");

    let snap = request_ok(&mut stdin, &mut reader, "6", "rollcall.snapshot", json!({}));
    assert_eq!(snap["snapshot"]["rollCall"]["calledCount"], 4);
    assert_eq!(snap["snapshot"]["rollCall"]["uncalledCount"], 0);

    let _ = request_ok(&mut stdin, &mut reader, "7", "rollcall.confirm", json!({}));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn redraw_returns_pending_student_to_the_pool() {
    let workspace = temp_dir("rollcall-random-redraw");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _class_id = seed_class(&mut stdin, &mut reader, &workspace, &["Ann", "Bo"]);

    let _ = request_ok(&mut stdin, &mut reader, "1", "rollcall.start", json!({ "mode": "random" }));
    // Skipping without an outcome keeps both students available.
    for i in 0..5 {
        let drawn = request_ok(
            &mut stdin,
            &mut reader,
            &format!("redraw-{}", i),
            "rollcall.drawNext",
            json!({}),
        );
        assert_eq!(drawn["snapshot"]["rollCall"]["calledCount"], 0);
        assert_eq!(drawn["snapshot"]["rollCall"]["uncalledCount"], 1);
    }

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
