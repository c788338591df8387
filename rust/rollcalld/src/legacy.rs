//! Import of the browser-era localStorage dump (`attendanceSystem` key).
//!
//! The dump used numeric ids, called the roll number `studentId` and the
//! call counter `totalAttendance`. Older entries may lack score and counters
//! entirely; those default to zero and rankings fall back to the record log.

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

use crate::model::{AttendanceRecord, AttendanceStatus, Class, Student};
use crate::roster::Roster;

/// Accept both `123`, `1700000000000.42` and `"abc"` as an id.
fn de_id<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(d)?;
    match v {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn de_opt_id<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    match v {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn de_status<'de, D>(d: D) -> Result<AttendanceStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(d)?;
    Ok(raw
        .as_deref()
        .and_then(AttendanceStatus::parse)
        .unwrap_or_default())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyClass {
    #[serde(deserialize_with = "de_id")]
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyStudent {
    #[serde(deserialize_with = "de_id")]
    id: String,
    name: String,
    #[serde(deserialize_with = "de_id")]
    student_id: String,
    #[serde(default, deserialize_with = "de_opt_id")]
    class_id: Option<String>,
    #[serde(default, deserialize_with = "de_status")]
    status: AttendanceStatus,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    total_attendance: Option<u32>,
    #[serde(default)]
    present_count: Option<u32>,
    #[serde(default)]
    late_count: Option<u32>,
    #[serde(default)]
    absent_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyRecord {
    #[serde(deserialize_with = "de_id")]
    id: String,
    #[serde(deserialize_with = "de_id")]
    student_id: String,
    #[serde(deserialize_with = "de_id")]
    class_id: String,
    #[serde(deserialize_with = "de_status")]
    status: AttendanceStatus,
    date: String,
    #[serde(default)]
    timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDump {
    #[serde(default)]
    students: Vec<LegacyStudent>,
    #[serde(default)]
    attendance_records: Vec<LegacyRecord>,
    #[serde(default)]
    classes: Vec<LegacyClass>,
}

#[derive(Debug, Clone)]
pub struct LegacyImport {
    pub roster: Roster,
    pub skipped_classes: usize,
    pub skipped_students: usize,
    pub skipped_records: usize,
    /// Records whose id collided with an earlier one and got a fresh id.
    pub rekeyed_records: usize,
}

pub fn parse_legacy_dump(text: &str) -> anyhow::Result<LegacyImport> {
    let dump: LegacyDump = serde_json::from_str(text).context("legacy dump is not valid JSON")?;

    // Legacy ids are millisecond timestamps, so two entities created in the same
    // millisecond share one. The first occurrence wins.
    let mut class_ids: HashSet<String> = HashSet::new();
    let mut classes = Vec::new();
    let mut skipped_classes = 0;
    for c in dump.classes {
        if !class_ids.insert(c.id.clone()) {
            skipped_classes += 1;
            continue;
        }
        classes.push(Class {
            id: c.id,
            name: c.name,
            description: c.description.filter(|d| !d.trim().is_empty()),
        });
    }

    let mut student_ids: HashSet<String> = HashSet::new();
    let mut seen_external: HashSet<String> = HashSet::new();
    let mut students = Vec::new();
    let mut skipped_students = 0;
    for s in dump.students {
        // Very old CSV imports carried no class reference at all.
        let Some(class_id) = s.class_id.filter(|c| class_ids.contains(c.as_str())) else {
            skipped_students += 1;
            continue;
        };
        let external_id = s.student_id.trim().to_string();
        if external_id.is_empty()
            || student_ids.contains(&s.id)
            || seen_external.contains(&external_id)
        {
            skipped_students += 1;
            continue;
        }
        student_ids.insert(s.id.clone());
        seen_external.insert(external_id.clone());
        students.push(Student {
            id: s.id,
            external_id,
            name: s.name.trim().to_string(),
            class_id,
            status: s.status,
            score: s.score.unwrap_or(0.0),
            total_calls: s.total_attendance.unwrap_or(0),
            present_count: s.present_count.unwrap_or(0),
            late_count: s.late_count.unwrap_or(0),
            absent_count: s.absent_count.unwrap_or(0),
        });
    }

    let mut record_ids: HashSet<String> = HashSet::new();
    let mut attendance_records = Vec::new();
    let mut skipped_records = 0;
    let mut rekeyed_records = 0;
    for r in dump.attendance_records {
        if !class_ids.contains(r.class_id.as_str()) || !r.status.is_outcome() {
            skipped_records += 1;
            continue;
        }
        // Distinct calls that collided on the clock; keep both.
        let id = if record_ids.insert(r.id.clone()) {
            r.id
        } else {
            rekeyed_records += 1;
            let fresh = Uuid::new_v4().to_string();
            record_ids.insert(fresh.clone());
            fresh
        };
        attendance_records.push(AttendanceRecord {
            id,
            student_id: r.student_id,
            class_id: r.class_id,
            status: r.status,
            date: r.date,
            timestamp: r.timestamp,
        });
    }

    Ok(LegacyImport {
        roster: Roster {
            classes,
            students,
            attendance_records,
        },
        skipped_classes,
        skipped_students,
        skipped_records,
        rekeyed_records,
    })
}

pub fn read_legacy_dump(path: &Path) -> anyhow::Result<LegacyImport> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    parse_legacy_dump(&text)
}
