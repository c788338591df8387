mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, seed_class, spawn_sidecar, temp_dir};

#[test]
fn deleting_the_active_class_resets_session_and_selection() {
    let workspace = temp_dir("rollcall-class-delete");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_class(&mut stdin, &mut reader, &workspace, &["Ann", "Bo"]);

    let other = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "classes.create",
        json!({ "name": "Other", "description": "spare" }),
    );
    let other_id = other["class"]["id"].as_str().expect("other id").to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "rollcall.start",
        json!({ "mode": "sequential" }),
    );

    // Removing an unrelated class leaves the roll call running.
    let kept = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classes.delete",
        json!({ "classId": other_id }),
    );
    assert_eq!(kept["snapshot"]["rollCall"]["state"], "active");

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "classes.delete",
        json!({ "classId": class_id }),
    );
    assert_eq!(deleted["deletedStudents"], 2);
    assert_eq!(deleted["snapshot"]["rollCall"]["state"], "idle");
    assert!(deleted["snapshot"]["currentClassId"].is_null());

    let code = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "rollcall.mark",
        json!({ "status": "present" }),
    );
    assert_eq!(code, "invalid_state");
    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "students.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(code, "not_found");

    let listed = request_ok(&mut stdin, &mut reader, "7", "classes.list", json!({}));
    assert_eq!(listed["classes"], json!([]));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn removing_a_student_in_the_session_resets_it() {
    let workspace = temp_dir("rollcall-student-delete");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_class(&mut stdin, &mut reader, &workspace, &["Ann", "Bo", "Cy"]);

    let started = request_ok(&mut stdin, &mut reader, "1", "question.start", json!({}));
    let current = started["snapshot"]["question"]["current"]["id"]
        .as_str()
        .expect("current")
        .to_string();

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.delete",
        json!({ "studentId": current }),
    );
    assert_eq!(removed["snapshot"]["question"]["state"], "idle");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(listed["students"].as_array().map(|a| a.len()), Some(2));

    // Renaming without moving keeps a running roll call.
    let started = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "rollcall.start",
        json!({ "mode": "sequential" }),
    );
    let first = started["snapshot"]["rollCall"]["current"]["id"]
        .as_str()
        .expect("first")
        .to_string();
    let first_external = started["snapshot"]["rollCall"]["current"]["externalId"]
        .as_str()
        .expect("externalId")
        .to_string();
    let renamed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.update",
        json!({ "studentId": first, "name": "Bob" }),
    );
    assert_eq!(renamed["snapshot"]["rollCall"]["state"], "active");
    assert_eq!(renamed["snapshot"]["rollCall"]["current"]["name"], "Bob");

    let code = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "students.create",
        json!({ "classId": class_id, "name": "Dup", "externalId": first_external }),
    );
    assert_eq!(code, "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn reset_data_zeroes_scores_and_ends_sessions() {
    let workspace = temp_dir("rollcall-reset-data");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_class(&mut stdin, &mut reader, &workspace, &["Ann"]);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rollcall.start",
        json!({ "mode": "sequential" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "rollcall.mark",
        json!({ "status": "present" }),
    );

    let reset = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classes.resetData",
        json!({ "classId": class_id }),
    );
    assert_eq!(reset["studentsReset"], 1);
    assert_eq!(reset["snapshot"]["rollCall"]["state"], "idle");

    let ranking = request_ok(&mut stdin, &mut reader, "4", "ranking.list", json!({}));
    let row = &ranking["rows"][0];
    assert_eq!(row["score"], 0.0);
    assert_eq!(row["totalCalls"], 0);
    assert_eq!(row["attendanceRate"], 0);
    assert_eq!(row["status"], "unknown");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
