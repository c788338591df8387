mod test_support;

use serde_json::json;
use test_support::{request_ok, seed_class, spawn_sidecar, spawn_sidecar_with, temp_dir};

#[test]
fn roster_survives_restart_and_sessions_start_idle() {
    let workspace = temp_dir("rollcall-reload");
    let ws = workspace.to_string_lossy().to_string();

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let class_id = seed_class(&mut stdin, &mut reader, &workspace, &["Ann", "Bo"]);
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
            json!({ "status": "late" }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "classes.update",
            json!({ "classId": class_id, "name": "K班", "description": "pair work" }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    let (mut child, mut stdin, mut reader) =
        spawn_sidecar_with(&[("ROLLCALLD_SEED", "1"), ("ROLLCALLD_WORKSPACE", ws.as_str())]);
    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["workspacePath"], ws.as_str());
    assert!(health["lastSaved"].is_string());
    assert_eq!(health["focus"], "idle");

    let classes = request_ok(&mut stdin, &mut reader, "2", "classes.list", json!({}));
    let class = &classes["classes"][0];
    assert_eq!(class["name"], "K班");
    assert_eq!(class["description"], "pair work");
    assert_eq!(class["studentCount"], 2);
    assert!(classes["currentClassId"].is_null());
    let class_id = class["id"].as_str().expect("class id").to_string();

    let students = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.list",
        json!({ "classId": class_id }),
    );
    let ann = &students["students"][0];
    assert_eq!(ann["name"], "Ann");
    assert_eq!(ann["status"], "late");
    assert_eq!(ann["score"], 1.0);
    assert_eq!(ann["lateCount"], 1);

    let snap = request_ok(&mut stdin, &mut reader, "4", "rollcall.snapshot", json!({}));
    assert_eq!(snap["snapshot"]["rollCall"]["state"], "idle");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn backup_bundle_restores_an_earlier_roster() {
    let workspace = temp_dir("rollcall-backup-ipc");
    let bundle = workspace.join("backups").join("ws.zip");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_class(&mut stdin, &mut reader, &workspace, &["Ann"]);

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.backupExport",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(exported["bundleFormat"], "rollcall-workspace-v1");
    assert!(bundle.is_file());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "classId": class_id, "name": "Late joiner", "externalId": "900" }),
    );

    let restored = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.backupImport",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(restored["dbSha256"], exported["dbSha256"]);
    assert_eq!(restored["studentCount"], 1);

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(listed["students"].as_array().map(|a| a.len()), Some(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
