use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::model::{AttendanceRecord, AttendanceStatus};
use crate::roster::Roster;

/// Points for showing up, late or not.
pub const ATTENDANCE_POINT: f64 = 1.0;

/// How well the student repeated the question back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatQuality {
    Correct,
    Incorrect,
}

impl RepeatQuality {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "correct" => Some(Self::Correct),
            "incorrect" => Some(Self::Incorrect),
            _ => None,
        }
    }

    pub fn delta(self) -> f64 {
        match self {
            Self::Correct => 0.5,
            Self::Incorrect => -1.0,
        }
    }
}

/// Answer grade; only these four point values exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerQuality(f64);

impl AnswerQuality {
    pub const ALLOWED: [f64; 4] = [0.5, 1.0, 2.0, 3.0];

    pub fn new(points: f64) -> CoreResult<Self> {
        if Self::ALLOWED.contains(&points) {
            Ok(Self(points))
        } else {
            Err(CoreError::invalid_argument(format!(
                "answer score must be one of 0.5, 1, 2, 3 (got {})",
                points
            )))
        }
    }

    pub fn delta(self) -> f64 {
        self.0
    }
}

/// Record a roll-call outcome: status, counters, score and the history log.
pub fn apply_attendance(
    roster: &mut Roster,
    student_id: &str,
    status: AttendanceStatus,
    at: DateTime<Local>,
) -> CoreResult<AttendanceRecord> {
    if !status.is_outcome() {
        return Err(CoreError::invalid_argument(
            "status must be present, late or absent",
        ));
    }
    let student = roster
        .student_mut(student_id)
        .ok_or_else(|| CoreError::not_found("student not found"))?;

    student.status = status;
    student.total_calls += 1;
    match status {
        AttendanceStatus::Present => {
            student.present_count += 1;
            student.score += ATTENDANCE_POINT;
        }
        AttendanceStatus::Late => {
            student.late_count += 1;
            student.score += ATTENDANCE_POINT;
        }
        AttendanceStatus::Absent => student.absent_count += 1,
        AttendanceStatus::Unknown => {}
    }

    let record = AttendanceRecord {
        id: Uuid::new_v4().to_string(),
        student_id: student.id.clone(),
        class_id: student.class_id.clone(),
        status,
        date: at.format("%Y-%m-%d").to_string(),
        timestamp: Some(at.to_rfc3339()),
    };
    roster.attendance_records.push(record.clone());
    Ok(record)
}

/// Score-only change; status, counters and the log are untouched.
pub fn apply_question_score(roster: &mut Roster, student_id: &str, delta: f64) -> CoreResult<f64> {
    let student = roster
        .student_mut(student_id)
        .ok_or_else(|| CoreError::not_found("student not found"))?;
    student.score += delta;
    Ok(student.score)
}
