mod question;
mod rollcall;

pub use question::{QuestionSession, QuestionView, ScoreOutcome};
pub use rollcall::{MarkOutcome, RollCallMode, RollCallSession, RollCallView};

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::model::{AttendanceStatus, Student};
use crate::probability;
use crate::roster::Roster;
use crate::scoring::{AnswerQuality, RepeatQuality};
use crate::selector;

/// Draw one id out of `pool` by weight and remove it from the pool.
fn draw_from<R>(pool: &mut Vec<String>, roster: &Roster, rng: &mut R) -> CoreResult<String>
where
    R: Rng + ?Sized,
{
    let candidates: Vec<&Student> = pool.iter().filter_map(|id| roster.student(id)).collect();
    if candidates.is_empty() {
        return Err(CoreError::empty("no students left to draw"));
    }
    let picked = selector::select_one(&candidates, rng)?.id.clone();
    log::debug!(
        "drew {} from {} candidates (lucky={})",
        picked,
        candidates.len(),
        roster
            .student(&picked)
            .map(|s| probability::is_lucky(s.score))
            .unwrap_or(false)
    );
    pool.retain(|id| *id != picked);
    Ok(picked)
}

/// What the front end shows for the student being called.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub id: String,
    pub name: String,
    pub external_id: String,
    pub score: f64,
    pub status: AttendanceStatus,
    pub is_lucky: bool,
}

impl From<&Student> for CandidateView {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            external_id: s.external_id.clone(),
            score: s.score,
            status: s.status,
            is_lucky: probability::is_lucky(s.score),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_class_id: Option<String>,
    /// Which session the front end should drive.
    pub focus: &'static str,
    pub roll_call: RollCallView,
    pub question: QuestionView,
}

/// Owns both sessions, the selected class and the random source.
pub struct SessionManager {
    rollcall: RollCallSession,
    question: QuestionSession,
    current_class: Option<String>,
    rng: StdRng,
    question_end_delay: Duration,
}

impl SessionManager {
    pub fn new(rng: StdRng, question_end_delay: Duration) -> Self {
        Self {
            rollcall: RollCallSession::Idle,
            question: QuestionSession::Idle,
            current_class: None,
            rng,
            question_end_delay,
        }
    }

    #[cfg(test)]
    pub fn rollcall(&self) -> &RollCallSession {
        &self.rollcall
    }

    pub fn question(&self) -> &QuestionSession {
        &self.question
    }

    pub fn current_class(&self) -> Option<&str> {
        self.current_class.as_deref()
    }

    pub fn select_class(&mut self, class_id: Option<String>) {
        self.current_class = class_id;
    }

    fn selected_candidates(&self, roster: &Roster) -> CoreResult<(String, Vec<String>)> {
        let Some(class_id) = self.current_class.clone() else {
            return Err(CoreError::invalid_state("select a class first"));
        };
        if roster.class(&class_id).is_none() {
            return Err(CoreError::not_found("selected class no longer exists"));
        }
        let ids: Vec<String> = roster
            .students_in_class(&class_id)
            .into_iter()
            .map(|s| s.id.clone())
            .collect();
        if ids.is_empty() {
            return Err(CoreError::empty("the selected class has no students"));
        }
        Ok((class_id, ids))
    }

    fn ensure_no_question(&self) -> CoreResult<()> {
        if self.question.is_active() {
            return Err(CoreError::invalid_state("a question session is in progress"));
        }
        Ok(())
    }

    pub fn start_rollcall(&mut self, mode: RollCallMode, roster: &mut Roster) -> CoreResult<()> {
        self.ensure_no_question()?;
        let (class_id, ids) = self.selected_candidates(roster)?;
        let session = match mode {
            RollCallMode::Sequential => RollCallSession::start_sequential(&class_id, ids, roster)?,
            RollCallMode::Random => {
                RollCallSession::start_random(&class_id, ids, roster, &mut self.rng)?
            }
        };
        log::info!("roll call started: class={} mode={:?}", class_id, mode);
        self.rollcall = session;
        Ok(())
    }

    pub fn mark(
        &mut self,
        status: AttendanceStatus,
        roster: &mut Roster,
        at: DateTime<Local>,
    ) -> CoreResult<MarkOutcome> {
        self.ensure_no_question()?;
        let outcome = self.rollcall.record_outcome(status, roster, at)?;
        if outcome.completed {
            log::info!("roll call completed");
        }
        Ok(outcome)
    }

    pub fn draw_next_rollcall(&mut self, roster: &mut Roster) -> CoreResult<String> {
        self.ensure_no_question()?;
        self.rollcall.draw_next(roster, &mut self.rng)
    }

    pub fn back(&mut self) -> CoreResult<bool> {
        self.ensure_no_question()?;
        self.rollcall.back()
    }

    pub fn back_from_completed(&mut self) -> CoreResult<()> {
        self.ensure_no_question()?;
        self.rollcall.back_from_completed()
    }

    /// Ends the roll call keeping every recorded outcome.
    pub fn confirm_completion(&mut self) -> CoreResult<()> {
        if self.rollcall.is_idle() {
            return Err(CoreError::invalid_state("no roll call to confirm"));
        }
        self.reset();
        Ok(())
    }

    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.rollcall.is_idle() && !self.question.is_active() {
            return Err(CoreError::invalid_state("no roll call to cancel"));
        }
        self.reset();
        Ok(())
    }

    pub fn start_question(&mut self, roster: &Roster) -> CoreResult<()> {
        if !self.rollcall.is_idle() {
            return Err(CoreError::invalid_state("a roll call is in progress"));
        }
        let (class_id, ids) = self.selected_candidates(roster)?;
        self.question = QuestionSession::start(&class_id, ids, roster, &mut self.rng)?;
        log::info!("question session started: class={}", class_id);
        Ok(())
    }

    pub fn draw_next_question(&mut self, roster: &Roster) -> CoreResult<String> {
        self.question.draw_next(roster, &mut self.rng)
    }

    pub fn score_repeat(
        &mut self,
        quality: RepeatQuality,
        roster: &mut Roster,
        now: Instant,
    ) -> CoreResult<ScoreOutcome> {
        self.question
            .score_repeat(quality, roster, now, self.question_end_delay)
    }

    pub fn score_answer(
        &mut self,
        quality: AnswerQuality,
        roster: &mut Roster,
        now: Instant,
    ) -> CoreResult<ScoreOutcome> {
        self.question
            .score_answer(quality, roster, now, self.question_end_delay)
    }

    pub fn end_question(&mut self) {
        if self.question.is_active() {
            log::info!("question session ended");
        }
        self.question.end();
    }

    /// Fire deferred callbacks that are due. Returns true if anything changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let ended = self.question.poll(now);
        if ended {
            log::info!("question session auto-ended after scoring");
        }
        ended
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.question.ends_at()
    }

    /// Both sessions back to Idle; the class selection is kept.
    pub fn reset(&mut self) {
        self.rollcall = RollCallSession::Idle;
        self.question = QuestionSession::Idle;
    }

    /// Drop sessions and selection that point at a removed class.
    pub fn on_class_deleted(&mut self, class_id: &str) {
        if self.rollcall.class_id() == Some(class_id) {
            self.rollcall = RollCallSession::Idle;
        }
        if self.question.class_id() == Some(class_id) {
            self.question = QuestionSession::Idle;
        }
        if self.current_class.as_deref() == Some(class_id) {
            self.current_class = None;
        }
    }

    /// Drop any session whose snapshot includes a student that left the roster.
    pub fn on_student_removed(&mut self, student_id: &str) {
        if self.rollcall.contains(student_id) {
            self.rollcall = RollCallSession::Idle;
        }
        if self.question.contains(student_id) {
            self.question = QuestionSession::Idle;
        }
    }

    pub fn snapshot(&self, roster: &Roster) -> SessionSnapshot {
        let focus = if self.question.is_active() {
            "question"
        } else if !self.rollcall.is_idle() {
            "rollCall"
        } else {
            "idle"
        };
        SessionSnapshot {
            current_class_id: self.current_class.clone(),
            focus,
            roll_call: self.rollcall.view(roster),
            question: self.question.view(roster),
        }
    }
}
