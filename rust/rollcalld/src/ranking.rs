use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{AttendanceStatus, Student};
use crate::probability;
use crate::roster::Roster;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceCounts {
    pub total_calls: u32,
    pub present: u32,
    pub late: u32,
    pub absent: u32,
}

impl AttendanceCounts {
    /// Whole-percent share of calls answered present or late.
    pub fn attendance_rate(&self) -> u32 {
        if self.total_calls == 0 {
            return 0;
        }
        let rate = f64::from(self.present + self.late) / f64::from(self.total_calls) * 100.0;
        rate.round() as u32
    }
}

/// Counters on the student win; the history log is only used when they are empty.
pub fn attendance_counts(roster: &Roster, student: &Student) -> AttendanceCounts {
    if student.total_calls > 0 {
        return AttendanceCounts {
            total_calls: student.total_calls,
            present: student.present_count,
            late: student.late_count,
            absent: student.absent_count,
        };
    }
    let mut counts = AttendanceCounts::default();
    for r in roster.records_for(&student.id) {
        match r.status {
            AttendanceStatus::Present => counts.present += 1,
            AttendanceStatus::Late => counts.late += 1,
            AttendanceStatus::Absent => counts.absent += 1,
            AttendanceStatus::Unknown => continue,
        }
        counts.total_calls += 1;
    }
    counts
}

/// One ranking-table / export row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingRow {
    pub rank: usize,
    pub student_id: String,
    pub name: String,
    pub external_id: String,
    pub score: f64,
    pub status: AttendanceStatus,
    pub attendance_rate: u32,
    pub total_calls: u32,
    pub present_count: u32,
    pub late_count: u32,
    pub absent_count: u32,
    /// Chance of being drawn from the whole class, in percent (1 decimal).
    pub probability: f64,
    pub is_lucky: bool,
}

fn round_1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Score desc, then attendance rate desc, then present count desc.
pub fn class_ranking(roster: &Roster, class_id: &str) -> Vec<RankingRow> {
    let mut rows: Vec<(&Student, AttendanceCounts)> = roster
        .students_in_class(class_id)
        .into_iter()
        .map(|s| (s, attendance_counts(roster, s)))
        .collect();

    rows.sort_by(|(a, ca), (b, cb)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| cb.attendance_rate().cmp(&ca.attendance_rate()))
            .then_with(|| cb.present.cmp(&ca.present))
    });

    let scores: Vec<f64> = rows.iter().map(|(s, _)| s.score).collect();
    let probabilities = probability::probabilities(&scores);

    rows.into_iter()
        .zip(probabilities)
        .enumerate()
        .map(|(i, ((s, c), p))| RankingRow {
            rank: i + 1,
            student_id: s.id.clone(),
            name: s.name.clone(),
            external_id: s.external_id.clone(),
            score: s.score,
            status: s.status,
            attendance_rate: c.attendance_rate(),
            total_calls: c.total_calls,
            present_count: c.present,
            late_count: c.late,
            absent_count: c.absent,
            probability: round_1(p * 100.0),
            is_lucky: probability::is_lucky(s.score),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingPage {
    pub page: usize,
    pub page_size: usize,
    pub total_students: usize,
    pub total_pages: usize,
    pub rows: Vec<RankingRow>,
}

/// 1-based page; past-the-end requests clamp to the last page.
pub fn paginate(rows: Vec<RankingRow>, page: usize, page_size: usize) -> RankingPage {
    let page_size = page_size.max(1);
    let total_students = rows.len();
    let total_pages = total_students.div_ceil(page_size);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * page_size;
    let rows = rows.into_iter().skip(start).take(page_size).collect();
    RankingPage {
        page,
        page_size,
        total_students,
        total_pages,
        rows,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total: usize,
    pub called: usize,
    pub present: usize,
    pub absent_or_late: usize,
}

/// Current-round counts from each student's latest status.
pub fn attendance_stats(roster: &Roster, class_id: &str) -> AttendanceStats {
    let mut stats = AttendanceStats::default();
    for s in roster.students_in_class(class_id) {
        stats.total += 1;
        match s.status {
            AttendanceStatus::Unknown => {}
            AttendanceStatus::Present => {
                stats.called += 1;
                stats.present += 1;
            }
            AttendanceStatus::Late | AttendanceStatus::Absent => {
                stats.called += 1;
                stats.absent_or_late += 1;
            }
        }
    }
    stats
}
