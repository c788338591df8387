use chrono::{DateTime, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{draw_from, CandidateView};
use crate::error::{CoreError, CoreResult};
use crate::model::{AttendanceRecord, AttendanceStatus};
use crate::roster::Roster;
use crate::scoring;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollCallMode {
    Sequential,
    Random,
}

impl RollCallMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sequential" => Some(Self::Sequential),
            "random" => Some(Self::Random),
            _ => None,
        }
    }
}

/// One pass over the roster in order. `cursor` splits called from uncalled.
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialRun {
    pub class_id: String,
    pub all: Vec<String>,
    pub cursor: usize,
}

impl SequentialRun {
    pub fn current(&self) -> Option<&String> {
        self.all.get(self.cursor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomRun {
    pub class_id: String,
    pub all: Vec<String>,
    pub called: Vec<String>,
    pub uncalled: Vec<String>,
    pub current: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RollCallSession {
    #[default]
    Idle,
    Sequential(SequentialRun),
    Random(RandomRun),
    /// Sequential run past its last student; `cursor == all.len()`.
    Completed(SequentialRun),
}

#[derive(Debug, Clone)]
pub struct MarkOutcome {
    pub record: AttendanceRecord,
    pub completed: bool,
}

impl RollCallSession {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn class_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Sequential(run) | Self::Completed(run) => Some(&run.class_id),
            Self::Random(run) => Some(&run.class_id),
        }
    }

    pub fn mode(&self) -> Option<RollCallMode> {
        match self {
            Self::Idle => None,
            Self::Sequential(_) | Self::Completed(_) => Some(RollCallMode::Sequential),
            Self::Random(_) => Some(RollCallMode::Random),
        }
    }

    pub fn current(&self) -> Option<&String> {
        match self {
            Self::Sequential(run) => run.current(),
            Self::Random(run) => run.current.as_ref(),
            Self::Idle | Self::Completed(_) => None,
        }
    }

    pub fn contains(&self, student_id: &str) -> bool {
        match self {
            Self::Idle => false,
            Self::Sequential(run) | Self::Completed(run) => {
                run.all.iter().any(|id| id == student_id)
            }
            Self::Random(run) => run.all.iter().any(|id| id == student_id),
        }
    }

    /// Full re-take: every candidate's status goes back to unknown.
    pub fn start_sequential(
        class_id: &str,
        candidates: Vec<String>,
        roster: &mut Roster,
    ) -> CoreResult<Self> {
        if candidates.is_empty() {
            return Err(CoreError::empty("class has no students"));
        }
        roster.reset_statuses(&candidates);
        Ok(Self::Sequential(SequentialRun {
            class_id: class_id.to_string(),
            all: candidates,
            cursor: 0,
        }))
    }

    /// Keeps earlier statuses; only each drawn student is reset.
    pub fn start_random<R>(
        class_id: &str,
        candidates: Vec<String>,
        roster: &mut Roster,
        rng: &mut R,
    ) -> CoreResult<Self>
    where
        R: Rng + ?Sized,
    {
        if candidates.is_empty() {
            return Err(CoreError::empty("class has no students"));
        }
        let mut run = RandomRun {
            class_id: class_id.to_string(),
            all: candidates.clone(),
            called: Vec::new(),
            uncalled: candidates,
            current: None,
        };
        let first = draw_from(&mut run.uncalled, roster, rng)?;
        roster.reset_statuses([&first]);
        run.current = Some(first);
        Ok(Self::Random(run))
    }

    pub fn record_outcome(
        &mut self,
        status: AttendanceStatus,
        roster: &mut Roster,
        at: DateTime<Local>,
    ) -> CoreResult<MarkOutcome> {
        let Some(student_id) = self.current().cloned() else {
            return Err(CoreError::invalid_state("no student is awaiting an outcome"));
        };
        let record = scoring::apply_attendance(roster, &student_id, status, at)?;

        let mut completed = false;
        match self {
            Self::Sequential(run) => {
                run.cursor += 1;
                if run.cursor >= run.all.len() {
                    run.cursor = run.all.len();
                    completed = true;
                }
            }
            Self::Random(run) => {
                run.called.push(student_id);
                run.current = None;
            }
            Self::Idle | Self::Completed(_) => {}
        }
        if completed {
            if let Self::Sequential(run) = std::mem::take(self) {
                *self = Self::Completed(run);
            }
        }
        Ok(MarkOutcome { record, completed })
    }

    /// Random mode only. A pending current student goes back into the pool.
    pub fn draw_next<R>(&mut self, roster: &mut Roster, rng: &mut R) -> CoreResult<String>
    where
        R: Rng + ?Sized,
    {
        let Self::Random(run) = self else {
            return Err(CoreError::invalid_state("draw next is only available in random mode"));
        };
        if run.uncalled.is_empty() && run.current.is_none() {
            return Err(CoreError::empty("every student has already been called"));
        }
        let mut pool = run.uncalled.clone();
        if let Some(pending) = run.current.as_ref() {
            pool.push(pending.clone());
        }
        let picked = draw_from(&mut pool, roster, rng)?;
        run.uncalled = pool;
        run.current = Some(picked.clone());
        roster.reset_statuses([&picked]);
        Ok(picked)
    }

    /// Sequential mode only; returns false at the first student.
    pub fn back(&mut self) -> CoreResult<bool> {
        let Self::Sequential(run) = self else {
            return Err(CoreError::invalid_state("back is only available in sequential mode"));
        };
        if run.cursor == 0 {
            return Ok(false);
        }
        run.cursor -= 1;
        Ok(true)
    }

    pub fn back_from_completed(&mut self) -> CoreResult<()> {
        if !matches!(self, Self::Completed(_)) {
            return Err(CoreError::invalid_state("roll call is not completed"));
        }
        if let Self::Completed(mut run) = std::mem::take(self) {
            run.cursor = run.all.len().saturating_sub(1);
            *self = Self::Sequential(run);
        }
        Ok(())
    }

    pub fn view(&self, roster: &Roster) -> RollCallView {
        let (state, total, called, uncalled, cursor) = match self {
            Self::Idle => ("idle", 0, 0, 0, None),
            Self::Sequential(run) => (
                "active",
                run.all.len(),
                run.cursor,
                run.all.len() - run.cursor,
                Some(run.cursor),
            ),
            Self::Completed(run) => (
                "completed",
                run.all.len(),
                run.all.len(),
                0,
                Some(run.cursor),
            ),
            Self::Random(run) => (
                "active",
                run.all.len(),
                run.called.len(),
                run.uncalled.len(),
                None,
            ),
        };
        RollCallView {
            state,
            mode: self.mode(),
            class_id: self.class_id().map(str::to_string),
            total,
            called_count: called,
            uncalled_count: uncalled,
            cursor,
            can_go_back: matches!(self, Self::Sequential(run) if run.cursor > 0),
            current: self
                .current()
                .and_then(|id| roster.student(id))
                .map(CandidateView::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollCallView {
    pub state: &'static str,
    pub mode: Option<RollCallMode>,
    pub class_id: Option<String>,
    pub total: usize,
    pub called_count: usize,
    pub uncalled_count: usize,
    pub cursor: Option<usize>,
    pub can_go_back: bool,
    pub current: Option<CandidateView>,
}
