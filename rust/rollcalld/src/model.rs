use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Unknown,
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "unknown" => Some(Self::Unknown),
            "present" => Some(Self::Present),
            "late" => Some(Self::Late),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }

    /// Statuses a roll call may record. `Unknown` only ever comes from a reset.
    pub fn is_outcome(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub class_id: String,
    #[serde(default)]
    pub status: AttendanceStatus,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub total_calls: u32,
    #[serde(default)]
    pub present_count: u32,
    #[serde(default)]
    pub late_count: u32,
    #[serde(default)]
    pub absent_count: u32,
}

impl Student {
    pub fn new(
        id: impl Into<String>,
        external_id: impl Into<String>,
        name: impl Into<String>,
        class_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            external_id: external_id.into(),
            name: name.into(),
            class_id: class_id.into(),
            status: AttendanceStatus::Unknown,
            score: 0.0,
            total_calls: 0,
            present_count: 0,
            late_count: 0,
            absent_count: 0,
        }
    }

    /// Zero the score and every counter, as on a class data reset.
    pub fn reset_progress(&mut self) {
        self.status = AttendanceStatus::Unknown;
        self.score = 0.0;
        self.total_calls = 0;
        self.present_count = 0;
        self.late_count = 0;
        self.absent_count = 0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub class_id: String,
    pub status: AttendanceStatus,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}
