mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, seed_class, spawn_sidecar, temp_dir};

#[test]
fn ranking_orders_by_score_then_rate_and_exports_csv() {
    let workspace = temp_dir("rollcall-ranking");
    let csv_out = workspace.join("exports").join("ranking.csv");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_class(&mut stdin, &mut reader, &workspace, &["Ann", "Bo", "Cy"]);

    // Ann present, Bo absent, Cy late: Ann and Cy tie on score and rate.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "rollcall.start",
        json!({ "mode": "sequential" }),
    );
    for (i, status) in ["present", "absent", "late"].iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("m{}", i),
            "rollcall.mark",
            json!({ "status": status }),
        );
    }
    let _ = request_ok(&mut stdin, &mut reader, "2", "rollcall.confirm", json!({}));

    let ranking = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "ranking.list",
        json!({ "classId": class_id }),
    );
    let rows = ranking["rows"].as_array().expect("rows");
    let names: Vec<&str> = rows.iter().map(|r| r["name"].as_str().expect("name")).collect();
    // Ann beats Cy on present count.
    assert_eq!(names, vec!["Ann", "Cy", "Bo"]);
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[0]["attendanceRate"], 100);
    assert_eq!(rows[2]["attendanceRate"], 0);

    // The lowest score carries the largest draw chance.
    let probs: Vec<f64> = rows
        .iter()
        .map(|r| r["probability"].as_f64().expect("probability"))
        .collect();
    assert!(probs[2] > probs[0]);
    let total: f64 = probs.iter().sum();
    assert!((total - 100.0).abs() < 0.2, "probabilities sum to {}", total);

    let paged = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "ranking.list",
        json!({ "classId": class_id, "page": 9, "pageSize": 2 }),
    );
    assert_eq!(paged["page"], 2);
    assert_eq!(paged["totalPages"], 2);
    assert_eq!(paged["rows"].as_array().map(|r| r.len()), Some(1));
    assert_eq!(paged["rows"][0]["name"], "Bo");

    let exported = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "exchange.exportRankingCsv",
        json!({ "classId": class_id, "outPath": csv_out.to_string_lossy() }),
    );
    assert_eq!(exported["rowsExported"], 3);
    let text = std::fs::read_to_string(&csv_out).expect("read csv");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "rank,name,externalId,score,attendanceRate,presentCount,lateCount,absentCount"
    );
    assert_eq!(lines[1], "1,Ann,001,1,100,1,0,0");
    assert_eq!(lines[3], "3,Bo,002,0,0,0,0,1");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn csv_student_import_skips_header_and_duplicates() {
    let workspace = temp_dir("rollcall-csv-import");
    let csv_in = workspace.join("students.csv");
    std::fs::write(
        &csv_in,
        "姓名,学号\n张三,102201\n李四,102202\n重复,102201\n\"Lee, Ann\",102203\nonly-name\n",
    )
    .expect("write csv");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_class(&mut stdin, &mut reader, &workspace, &[]);

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "exchange.importStudentsCsv",
        json!({ "classId": class_id, "path": csv_in.to_string_lossy() }),
    );
    assert_eq!(imported["imported"], 3);
    assert_eq!(imported["skipped"], 2);
    assert_eq!(imported["notice"]["severity"], "info");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.list",
        json!({ "classId": class_id }),
    );
    let names: Vec<&str> = listed["students"]
        .as_array()
        .expect("students")
        .iter()
        .map(|s| s["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["张三", "李四", "Lee, Ann"]);

    let code = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "exchange.importStudentsCsv",
        json!({ "classId": class_id, "path": workspace.join("missing.csv").to_string_lossy() }),
    );
    assert_eq!(code, "io_failed");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
