use crate::ipc::helpers::{get_required_str, persisted, require_workspace, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::ranking;
use serde_json::json;
use std::path::PathBuf;

const HEADER_WORDS: [&str; 2] = ["姓名", "学号"];
const HEADER_FIELDS: [&str; 4] = ["name", "id", "studentid", "externalid"];

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn parse_csv_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut buf)),
            _ => buf.push(ch),
        }
    }
    out.push(buf);
    out
}

/// Chinese labels match anywhere in a field ("姓名*"); ASCII labels must be
/// the whole field ("David" is a name, not an `id` column).
fn is_header(fields: &[String]) -> bool {
    fields.iter().any(|f| {
        let f = f.trim().to_lowercase();
        HEADER_WORDS.iter().any(|w| f.contains(w)) || HEADER_FIELDS.contains(&f.as_str())
    })
}

/// `(name, externalId)` rows plus the count of lines too short to use.
fn parse_student_rows(text: &str) -> (Vec<(String, String)>, usize) {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = Vec::new();
    let mut short = 0;
    let mut first = true;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_record(line);
        if first {
            first = false;
            if is_header(&fields) {
                continue;
            }
        }
        let name = fields.first().map(|s| s.trim()).unwrap_or("");
        let external_id = fields.get(1).map(|s| s.trim()).unwrap_or("");
        if name.is_empty() || external_id.is_empty() {
            short += 1;
            continue;
        }
        rows.push((name.to_string(), external_id.to_string()));
    }
    (rows, short)
}

fn import_students_csv(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    require_workspace(state)?;
    let class_id = get_required_str(params, "classId")?;
    let path = PathBuf::from(get_required_str(params, "path")?);
    let text = std::fs::read_to_string(&path).map_err(|e| HandlerErr {
        code: "io_failed",
        message: e.to_string(),
        details: Some(json!({ "path": path.to_string_lossy() })),
    })?;

    let (rows, short) = parse_student_rows(&text);
    let summary = state.roster.import_students(&class_id, rows)?;
    let skipped = summary.skipped + short;
    log::info!(
        "csv import into {}: {} imported, {} skipped",
        class_id,
        summary.imported,
        skipped
    );
    let msg = format!("imported {} students, skipped {}", summary.imported, skipped);
    let severity = if skipped > 0 { "info" } else { "success" };
    Ok(persisted(
        state,
        json!({ "imported": summary.imported, "skipped": skipped }),
        msg,
        severity,
    ))
}

fn handle_import_students_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, import_students_csv(state, &req.params))
}

fn export_ranking_csv(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let out_path = PathBuf::from(get_required_str(params, "outPath")?);
    if state.roster.class(&class_id).is_none() {
        return Err(HandlerErr::new("not_found", "class not found"));
    }

    let rows = ranking::class_ranking(&state.roster, &class_id);
    let mut out = String::new();
    out.push_str("rank,name,externalId,score,attendanceRate,presentCount,lateCount,absentCount\n");
    for r in &rows {
        let line = [
            r.rank.to_string(),
            csv_quote(&r.name),
            csv_quote(&r.external_id),
            r.score.to_string(),
            r.attendance_rate.to_string(),
            r.present_count.to_string(),
            r.late_count.to_string(),
            r.absent_count.to_string(),
        ]
        .join(",");
        out.push_str(&line);
        out.push('\n');
    }

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| HandlerErr::new("io_failed", e.to_string()))?;
        }
    }
    std::fs::write(&out_path, out).map_err(|e| HandlerErr {
        code: "io_failed",
        message: e.to_string(),
        details: Some(json!({ "path": out_path.to_string_lossy() })),
    })?;

    Ok(json!({
        "outPath": out_path.to_string_lossy(),
        "rowsExported": rows.len(),
    }))
}

fn handle_export_ranking_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, export_ranking_csv(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exchange.importStudentsCsv" => Some(handle_import_students_csv(state, req)),
        "exchange.exportRankingCsv" => Some(handle_export_ranking_csv(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        assert_eq!(
            parse_csv_record(r#""Lee, Ann","say ""hi""",3"#),
            vec!["Lee, Ann", "say \"hi\"", "3"]
        );
        assert_eq!(csv_quote("Lee, Ann"), "\"Lee, Ann\"");
        assert_eq!(csv_quote("plain"), "plain");
    }

    #[test]
    fn header_row_and_short_rows_are_skipped() {
        let text = "\u{feff}姓名,学号\n张三,102201\n\n李四\n王五,102203,extra\n";
        let (rows, short) = parse_student_rows(text);
        assert_eq!(
            rows,
            vec![
                ("张三".to_string(), "102201".to_string()),
                ("王五".to_string(), "102203".to_string()),
            ]
        );
        assert_eq!(short, 1);
    }

    #[test]
    fn first_row_without_header_tokens_is_data() {
        let (rows, short) = parse_student_rows("David,001\nBo,002\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(short, 0);
    }
}
