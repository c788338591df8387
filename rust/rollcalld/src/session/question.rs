use std::time::{Duration, Instant};

use rand::Rng;
use serde::Serialize;

use super::{draw_from, CandidateView};
use crate::error::{CoreError, CoreResult};
use crate::roster::Roster;
use crate::scoring::{self, AnswerQuality, RepeatQuality};

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionRun {
    pub class_id: String,
    pub all: Vec<String>,
    pub questioned: Vec<String>,
    pub unquestioned: Vec<String>,
    pub current: Option<String>,
    /// The scored student, shown until the session ends. Already in `questioned`.
    pub answered: Option<String>,
    pub repeat_scored: bool,
    pub answer_scored: bool,
    /// Armed by the first score; the session ends once it passes.
    pub ends_at: Option<Instant>,
}

impl QuestionRun {
    fn scored(&self) -> bool {
        self.repeat_scored || self.answer_scored
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum QuestionSession {
    #[default]
    Idle,
    Active(QuestionRun),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    pub delta: f64,
    pub new_score: f64,
}

impl QuestionSession {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn class_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Active(run) => Some(&run.class_id),
        }
    }

    pub fn current(&self) -> Option<&String> {
        match self {
            Self::Idle => None,
            Self::Active(run) => run.current.as_ref(),
        }
    }

    pub fn contains(&self, student_id: &str) -> bool {
        match self {
            Self::Idle => false,
            Self::Active(run) => run.all.iter().any(|id| id == student_id),
        }
    }

    pub fn ends_at(&self) -> Option<Instant> {
        match self {
            Self::Idle => None,
            Self::Active(run) => run.ends_at,
        }
    }

    /// Statuses are left alone; the first student is drawn immediately.
    pub fn start<R>(
        class_id: &str,
        candidates: Vec<String>,
        roster: &Roster,
        rng: &mut R,
    ) -> CoreResult<Self>
    where
        R: Rng + ?Sized,
    {
        if candidates.is_empty() {
            return Err(CoreError::empty("class has no students"));
        }
        let mut run = QuestionRun {
            class_id: class_id.to_string(),
            all: candidates.clone(),
            questioned: Vec::new(),
            unquestioned: candidates,
            current: None,
            answered: None,
            repeat_scored: false,
            answer_scored: false,
            ends_at: None,
        };
        run.current = Some(draw_from(&mut run.unquestioned, roster, rng)?);
        Ok(Self::Active(run))
    }

    pub fn draw_next<R>(&mut self, roster: &Roster, rng: &mut R) -> CoreResult<String>
    where
        R: Rng + ?Sized,
    {
        let Self::Active(run) = self else {
            return Err(CoreError::invalid_state("no question session is active"));
        };
        if run.scored() {
            return Err(CoreError::invalid_state("question already scored; session is ending"));
        }
        if run.unquestioned.is_empty() && run.current.is_none() {
            return Err(CoreError::empty("every student has already been questioned"));
        }
        let mut pool = run.unquestioned.clone();
        if let Some(pending) = run.current.as_ref() {
            pool.push(pending.clone());
        }
        let picked = draw_from(&mut pool, roster, rng)?;
        run.unquestioned = pool;
        run.current = Some(picked.clone());
        run.repeat_scored = false;
        run.answer_scored = false;
        Ok(picked)
    }

    fn apply_score(
        &mut self,
        delta: f64,
        roster: &mut Roster,
        now: Instant,
        end_delay: Duration,
        mark: fn(&mut QuestionRun),
    ) -> CoreResult<ScoreOutcome> {
        let Self::Active(run) = self else {
            return Err(CoreError::invalid_state("no question session is active"));
        };
        if run.scored() {
            return Err(CoreError::invalid_state("this question has already been scored"));
        }
        let Some(student_id) = run.current.clone() else {
            return Err(CoreError::invalid_state("no student has been drawn"));
        };
        let new_score = scoring::apply_question_score(roster, &student_id, delta)?;
        mark(run);
        run.current = None;
        run.questioned.push(student_id.clone());
        run.answered = Some(student_id);
        run.ends_at = Some(now + end_delay);
        Ok(ScoreOutcome { delta, new_score })
    }

    pub fn score_repeat(
        &mut self,
        quality: RepeatQuality,
        roster: &mut Roster,
        now: Instant,
        end_delay: Duration,
    ) -> CoreResult<ScoreOutcome> {
        self.apply_score(quality.delta(), roster, now, end_delay, |run| {
            run.repeat_scored = true
        })
    }

    pub fn score_answer(
        &mut self,
        quality: AnswerQuality,
        roster: &mut Roster,
        now: Instant,
        end_delay: Duration,
    ) -> CoreResult<ScoreOutcome> {
        self.apply_score(quality.delta(), roster, now, end_delay, |run| {
            run.answer_scored = true
        })
    }

    /// Idempotent.
    pub fn end(&mut self) {
        *self = Self::Idle;
    }

    /// Runs the deferred auto-end. Returns true when the session ended.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.ends_at() {
            Some(deadline) if now >= deadline => {
                self.end();
                true
            }
            _ => false,
        }
    }

    pub fn view(&self, roster: &Roster) -> QuestionView {
        match self {
            Self::Idle => QuestionView {
                state: "idle",
                class_id: None,
                total: 0,
                questioned_count: 0,
                unquestioned_count: 0,
                current: None,
                answered: None,
                repeat_scored: false,
                answer_scored: false,
                ending: false,
            },
            Self::Active(run) => QuestionView {
                state: "active",
                class_id: Some(run.class_id.clone()),
                total: run.all.len(),
                questioned_count: run.questioned.len(),
                unquestioned_count: run.unquestioned.len(),
                current: run
                    .current
                    .as_ref()
                    .and_then(|id| roster.student(id))
                    .map(CandidateView::from),
                answered: run
                    .answered
                    .as_ref()
                    .and_then(|id| roster.student(id))
                    .map(CandidateView::from),
                repeat_scored: run.repeat_scored,
                answer_scored: run.answer_scored,
                ending: run.ends_at.is_some(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub state: &'static str,
    pub class_id: Option<String>,
    pub total: usize,
    pub questioned_count: usize,
    pub unquestioned_count: usize,
    pub current: Option<CandidateView>,
    pub answered: Option<CandidateView>,
    pub repeat_scored: bool,
    pub answer_scored: bool,
    pub ending: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const DELAY: Duration = Duration::from_millis(1500);

    fn setup() -> (Roster, String, Vec<String>, StdRng) {
        let mut roster = Roster::default();
        let c = roster.create_class("K", None).expect("class").id;
        let ids = (0..4)
            .map(|i| {
                roster
                    .create_student(&c, &format!("S{i}"), &format!("{i:03}"))
                    .expect("student")
                    .id
            })
            .collect();
        (roster, c, ids, StdRng::seed_from_u64(17))
    }

    #[test]
    fn answer_scored_once_then_rejected() {
        let (mut roster, c, ids, mut rng) = setup();
        let mut q = QuestionSession::start(&c, ids, &roster, &mut rng).expect("start");
        let sid = q.current().cloned().expect("current");
        let now = Instant::now();

        let out = q
            .score_answer(AnswerQuality::new(2.0).expect("q"), &mut roster, now, DELAY)
            .expect("score");
        assert_eq!(out.new_score, 2.0);
        assert!(matches!(&q, QuestionSession::Active(run) if run.answer_scored));

        let err = q
            .score_answer(AnswerQuality::new(1.0).expect("q"), &mut roster, now, DELAY)
            .expect_err("second score");
        assert!(matches!(err, CoreError::InvalidState(_)));
        assert_eq!(roster.student(&sid).expect("s").score, 2.0);
    }

    #[test]
    fn scored_student_moves_from_current_to_questioned() {
        let (mut roster, c, ids, mut rng) = setup();
        let total = ids.len();
        let mut q = QuestionSession::start(&c, ids, &roster, &mut rng).expect("start");
        let sid = q.current().cloned().expect("current");
        q.score_answer(
            AnswerQuality::new(1.0).expect("q"),
            &mut roster,
            Instant::now(),
            DELAY,
        )
        .expect("score");

        let view = q.view(&roster);
        let current = usize::from(view.current.is_some());
        assert_eq!(view.questioned_count + view.unquestioned_count + current, total);
        assert_eq!(view.questioned_count, 1);
        assert!(view.current.is_none());
        assert_eq!(view.answered.map(|s| s.id), Some(sid));
    }

    #[test]
    fn repeat_and_answer_are_mutually_exclusive() {
        let (mut roster, c, ids, mut rng) = setup();
        let mut q = QuestionSession::start(&c, ids, &roster, &mut rng).expect("start");
        let now = Instant::now();
        q.score_repeat(RepeatQuality::Correct, &mut roster, now, DELAY)
            .expect("repeat");
        assert!(q
            .score_answer(AnswerQuality::new(3.0).expect("q"), &mut roster, now, DELAY)
            .is_err());
    }

    #[test]
    fn scoring_schedules_auto_end() {
        let (mut roster, c, ids, mut rng) = setup();
        let mut q = QuestionSession::start(&c, ids, &roster, &mut rng).expect("start");
        let now = Instant::now();
        q.score_repeat(RepeatQuality::Incorrect, &mut roster, now, DELAY)
            .expect("repeat");
        assert!(!q.poll(now + Duration::from_millis(100)));
        assert!(q.is_active());
        assert!(q.poll(now + DELAY));
        assert_eq!(q, QuestionSession::Idle);
    }

    #[test]
    fn draw_next_clears_flags_and_keeps_partition() {
        let (roster, c, ids, mut rng) = setup();
        let mut q = QuestionSession::start(&c, ids.clone(), &roster, &mut rng).expect("start");
        q.draw_next(&roster, &mut rng).expect("next");
        let QuestionSession::Active(run) = &q else {
            panic!("expected active");
        };
        assert!(!run.repeat_scored && !run.answer_scored);
        assert_eq!(run.unquestioned.len() + 1 + run.questioned.len(), ids.len());
    }

    #[test]
    fn scoring_without_session_is_invalid_state() {
        let (mut roster, _, _, _) = setup();
        let mut q = QuestionSession::Idle;
        let err = q
            .score_repeat(RepeatQuality::Correct, &mut roster, Instant::now(), DELAY)
            .expect_err("idle");
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn end_is_idempotent() {
        let (roster, c, ids, mut rng) = setup();
        let mut q = QuestionSession::start(&c, ids, &roster, &mut rng).expect("start");
        q.end();
        q.end();
        assert_eq!(q, QuestionSession::Idle);
    }
}
