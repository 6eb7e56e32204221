use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use teloxide::types::UserId;

use crate::quiz::error::EngineError;
use crate::quiz::packs::{pick_questions, Level, Packs};
use crate::quiz::render::{self, Summary};
use crate::quiz::scoring::{self, Score};
use crate::quiz::tags::TagsMap;
use crate::quiz::Question;

pub const DEFAULT_QUESTIONS_PER_ROUND: usize = 10;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub questions_per_round: usize,
    pub shuffle_seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            questions_per_round: DEFAULT_QUESTIONS_PER_ROUND,
            shuffle_seed: None,
        }
    }
}

/// A question the user got wrong, kept for the final report.
#[derive(Debug, Clone, PartialEq)]
pub struct MissedQuestion {
    pub text: String,
    pub correct: String,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub pack_code: String,
    pub questions: Vec<Question>,
    pub index: usize,
    pub score: f64,
    pub correct_count: usize,
    /// Tag and error count, in the order tags were first missed.
    pub errors_by_tag: Vec<(String, usize)>,
    pub missed: Vec<MissedQuestion>,
}

impl Session {
    pub fn new(pack_code: String, questions: Vec<Question>) -> Self {
        Self {
            pack_code,
            questions,
            index: 0,
            score: 0.0,
            correct_count: 0,
            errors_by_tag: Vec::new(),
            missed: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.index >= self.questions.len()
    }

    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    fn record(&mut self, question: &Question, score: Score) {
        self.score += score.points;
        if score.correct {
            self.correct_count += 1;
            return;
        }
        for tag in &question.tags {
            match self.errors_by_tag.iter_mut().find(|(t, _)| t == tag) {
                Some((_, count)) => *count += 1,
                None => self.errors_by_tag.push((tag.clone(), 1)),
            }
        }
        self.missed.push(MissedQuestion {
            text: question.text.clone(),
            correct: question.correct_answer_text(),
            explanation: question.explanation.clone(),
        });
    }

    /// Up to `limit` tags with the most errors; ties keep first-seen order.
    pub fn hardest_tags(&self, limit: usize) -> Vec<String> {
        let mut tags = self.errors_by_tag.clone();
        tags.sort_by(|a, b| b.1.cmp(&a.1));
        tags.into_iter().take(limit).map(|(tag, _)| tag).collect()
    }
}

/// Per-user sessions. A user has at most one.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<UserId, Session>,
}

impl SessionStore {
    pub fn insert(&mut self, user: UserId, session: Session) {
        self.sessions.insert(user, session);
    }

    pub fn get(&self, user: UserId) -> Option<&Session> {
        self.sessions.get(&user)
    }

    pub fn get_mut(&mut self, user: UserId) -> Option<&mut Session> {
        self.sessions.get_mut(&user)
    }

    pub fn remove(&mut self, user: UserId) -> Option<Session> {
        self.sessions.remove(&user)
    }
}

#[derive(Debug, Clone)]
pub enum CheckOutcome {
    Next {
        feedback: String,
        question: Question,
    },
    Finished {
        feedback: String,
        summary: Summary,
    },
}

impl CheckOutcome {
    pub fn feedback(&self) -> &str {
        match self {
            CheckOutcome::Next { feedback, .. } | CheckOutcome::Finished { feedback, .. } => {
                feedback
            }
        }
    }
}

pub struct QuizEngine {
    packs: Packs,
    tags: TagsMap,
    settings: EngineSettings,
    sessions: SessionStore,
    rng: StdRng,
}

impl QuizEngine {
    pub fn new(packs: Packs, tags: TagsMap, settings: EngineSettings) -> Self {
        let rng = match settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            packs,
            tags,
            settings,
            sessions: SessionStore::default(),
            rng,
        }
    }

    pub fn has_packs(&self) -> bool {
        !self.packs.is_empty()
    }

    pub fn pick_pack(&mut self, level: Level) -> Option<String> {
        self.packs.pick_for_level(level, &mut self.rng)
    }

    /// Starts a fresh round for the user, replacing any previous session.
    pub fn start_session(&mut self, user: UserId, pack_code: &str) -> Result<&Question, EngineError> {
        let pack = self
            .packs
            .get(pack_code)
            .ok_or_else(|| EngineError::UnknownPack(pack_code.to_string()))?;
        let questions = pick_questions(pack, self.settings.questions_per_round, &mut self.rng);
        if questions.is_empty() {
            return Err(EngineError::EmptyPack(pack_code.to_string()));
        }
        log::debug!(
            "Starting session for {} with {} questions from {}",
            user.0,
            questions.len(),
            pack_code
        );
        self.sessions
            .insert(user, Session::new(pack_code.to_string(), questions));
        self.current(user)
    }

    pub fn has_active(&self, user: UserId) -> bool {
        self.sessions.get(user).map_or(false, |s| !s.is_done())
    }

    pub fn current(&self, user: UserId) -> Result<&Question, EngineError> {
        self.sessions
            .get(user)
            .and_then(Session::current)
            .ok_or(EngineError::NoActiveSession)
    }

    pub fn session(&self, user: UserId) -> Option<&Session> {
        self.sessions.get(user)
    }

    /// Scores the answer to the current question and moves on by one.
    pub fn check(&mut self, user: UserId, answer: &str) -> Result<CheckOutcome, EngineError> {
        let session = self
            .sessions
            .get_mut(user)
            .filter(|s| !s.is_done())
            .ok_or(EngineError::NoActiveSession)?;

        let question = session.questions[session.index].clone();
        let score = scoring::score(&question, answer);
        session.record(&question, score);
        session.index += 1;

        let feedback = render::feedback(&question, score);
        match session.current() {
            Some(next) => Ok(CheckOutcome::Next {
                feedback,
                question: next.clone(),
            }),
            None => {
                log::debug!(
                    "Session for {} on {} finished: {}/{}",
                    user.0,
                    session.pack_code,
                    session.correct_count,
                    session.total()
                );
                Ok(CheckOutcome::Finished {
                    feedback,
                    summary: Summary::build(session, &self.tags),
                })
            }
        }
    }

    /// Drops the user's session. Returns whether there was one.
    pub fn cancel(&mut self, user: UserId) -> bool {
        self.sessions.remove(user).is_some()
    }
}
