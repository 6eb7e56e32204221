use std::collections::HashSet;

use crate::quiz::{Question, QuestionKind};

/// Weight of each extra wrong letter in a multi-choice answer.
const WRONG_PICK_PENALTY: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Points added to the session, partial credit included.
    pub points: f64,
    /// Fully correct answer.
    pub correct: bool,
}

impl Score {
    fn full() -> Self {
        Self {
            points: 1.0,
            correct: true,
        }
    }

    fn zero() -> Self {
        Self {
            points: 0.0,
            correct: false,
        }
    }
}

pub fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Letters of a multi-choice answer, separated by commas, semicolons or
/// whitespace.
pub fn split_letters(s: &str) -> Vec<String> {
    s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect()
}

pub fn score(question: &Question, answer: &str) -> Score {
    match question.kind {
        QuestionKind::Single => score_single(question, answer),
        QuestionKind::Multi => score_multi(question, answer),
        QuestionKind::Free => score_free(question, answer),
    }
}

pub fn score_single(question: &Question, answer: &str) -> Score {
    let correct = question.answer.values().first().map(|v| normalize(v));
    match correct {
        Some(correct) if normalize(answer) == correct => Score::full(),
        _ => Score::zero(),
    }
}

pub fn score_multi(question: &Question, answer: &str) -> Score {
    let correct: HashSet<String> = question.answer.values().iter().map(|v| normalize(v)).collect();
    let user: HashSet<String> = split_letters(answer).into_iter().collect();
    if user.is_empty() {
        return Score::zero();
    }
    if user == correct {
        return Score::full();
    }

    let denominator = correct.len().max(1) as f64;
    let hit = user.intersection(&correct).count() as f64 / denominator;
    let wrong = user.difference(&correct).count() as f64 / denominator;
    let partial = (hit - WRONG_PICK_PENALTY * wrong).max(0.0);
    Score {
        points: (partial * 100.0).round() / 100.0,
        correct: false,
    }
}

pub fn score_free(question: &Question, answer: &str) -> Score {
    let user = normalize(answer);
    if user.is_empty() {
        return Score::zero();
    }
    let variants = question
        .answer
        .values()
        .iter()
        .map(|v| normalize(v))
        .collect::<Vec<_>>();
    if variants.iter().any(|v| *v == user) {
        return Score::full();
    }

    let loose_match = variants.iter().any(|variant| {
        let mut words = variant.split_whitespace().peekable();
        words.peek().is_some() && words.all(|word| user.contains(word))
    });
    if loose_match {
        Score::full()
    } else {
        Score::zero()
    }
}
