//! Training quiz scoring and badge state

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::Error;

/// A multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,

    /// Index into `options`
    pub correct_option: usize,
    pub explanation: String,
}

/// Result of answering the current question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_option: usize,
    pub explanation: String,
}

/// Result band shown on the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl PerformanceLevel {
    pub fn from_percent(percent: u32) -> Self {
        if percent >= 90 {
            Self::Excellent
        } else if percent >= 75 {
            Self::Good
        } else if percent >= 60 {
            Self::Fair
        } else {
            Self::NeedsImprovement
        }
    }
}

/// One run through a list of questions.
///
/// Each question has its own countdown that restarts on `next()`. Running out
/// of time is reported by `is_expired()` but does not block answering.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    time_limit: Duration,
    badge_threshold_percent: u32,
    current: usize,
    selected: Option<usize>,
    score: u32,
    completed: bool,
    question_started: Instant,
}

impl QuizSession {
    pub fn new(
        questions: Vec<Question>,
        time_limit: Duration,
        badge_threshold_percent: u32,
    ) -> Result<Self, Error> {
        if questions.is_empty() {
            return Err(Error::validation("questions", "A quiz needs at least one question"));
        }
        if let Some(q) = questions.iter().find(|q| q.correct_option >= q.options.len()) {
            return Err(Error::validation(
                "questions",
                format!("Question {} has no option {}", q.id, q.correct_option),
            ));
        }

        Ok(Self {
            questions,
            time_limit,
            badge_threshold_percent,
            current: 0,
            selected: None,
            score: 0,
            completed: false,
            question_started: Instant::now(),
        })
    }

    /// The question being asked, or `None` once completed
    pub fn current_question(&self) -> Option<&Question> {
        if self.completed {
            return None;
        }
        self.questions.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The option picked for the current question
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Answer the current question.
    ///
    /// Only the first answer per question is scored; later calls return the
    /// outcome of that first answer.
    pub fn answer(&mut self, option: usize) -> Result<AnswerOutcome, Error> {
        let question = self
            .current_question()
            .ok_or_else(|| Error::validation("quiz", "The quiz is already completed"))?;
        if option >= question.options.len() {
            return Err(Error::validation("option", "No such option"));
        }

        let outcome_for = |picked: usize| AnswerOutcome {
            correct: picked == question.correct_option,
            correct_option: question.correct_option,
            explanation: question.explanation.clone(),
        };

        if let Some(previous) = self.selected {
            return Ok(outcome_for(previous));
        }

        let outcome = outcome_for(option);
        if outcome.correct {
            self.score += 1;
        }
        self.selected = Some(option);
        Ok(outcome)
    }

    /// Move to the next question, completing the quiz after the last one
    pub fn next(&mut self) {
        if self.completed {
            return;
        }
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.selected = None;
            self.question_started = Instant::now();
        } else {
            self.completed = true;
        }
    }

    /// Time left on the current question
    pub fn time_remaining(&self) -> Duration {
        self.time_limit.saturating_sub(self.question_started.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        !self.completed && self.time_remaining().is_zero()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Correct answers so far
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Score as a whole percentage of all questions, rounded down
    pub fn score_percent(&self) -> u32 {
        let total = self.questions.len() as u32;
        self.score * 100 / total.max(1)
    }

    pub fn performance(&self) -> PerformanceLevel {
        PerformanceLevel::from_percent(self.score_percent())
    }

    /// Whether the completed quiz earned the badge
    pub fn badge_unlocked(&self) -> bool {
        self.completed && self.score_percent() >= self.badge_threshold_percent
    }

    /// Start over with the same questions
    pub fn restart(&mut self) {
        self.current = 0;
        self.selected = None;
        self.score = 0;
        self.completed = false;
        self.question_started = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: format!("q{}", i),
                prompt: format!("Question {}", i),
                options: vec!["yes".into(), "no".into(), "maybe".into()],
                correct_option: 0,
                explanation: "Because".into(),
            })
            .collect()
    }

    fn session(n: usize) -> QuizSession {
        QuizSession::new(questions(n), Duration::from_secs(30), 90).unwrap()
    }

    #[test]
    fn empty_quiz_is_rejected() {
        assert!(matches!(
            QuizSession::new(Vec::new(), Duration::from_secs(30), 90),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn only_first_answer_counts() {
        let mut quiz = session(2);
        assert!(!quiz.answer(1).unwrap().correct);
        let again = quiz.answer(0).unwrap();
        assert!(!again.correct);
        assert_eq!(quiz.score(), 0);
        assert_eq!(quiz.selected(), Some(1));
    }

    #[test]
    fn out_of_range_option() {
        let mut quiz = session(1);
        assert!(quiz.answer(3).is_err());
        assert_eq!(quiz.selected(), None);
    }

    #[test]
    fn badge_needs_ninety_percent() {
        let mut quiz = session(10);
        for i in 0..10 {
            quiz.answer(if i == 0 { 1 } else { 0 }).unwrap();
            assert!(!quiz.badge_unlocked());
            quiz.next();
        }
        assert!(quiz.is_completed());
        assert_eq!(quiz.score_percent(), 90);
        assert!(quiz.badge_unlocked());
        assert_eq!(quiz.performance(), PerformanceLevel::Excellent);
        assert!(quiz.current_question().is_none());
    }

    #[test]
    fn below_threshold_has_no_badge() {
        let mut quiz = session(4);
        quiz.answer(0).unwrap();
        quiz.next();
        quiz.answer(0).unwrap();
        quiz.next();
        quiz.next();
        quiz.next();
        assert_eq!(quiz.score_percent(), 50);
        assert!(!quiz.badge_unlocked());
        assert_eq!(quiz.performance(), PerformanceLevel::NeedsImprovement);
    }

    #[test]
    fn restart_resets_progress() {
        let mut quiz = session(1);
        quiz.answer(0).unwrap();
        quiz.next();
        quiz.restart();
        assert!(!quiz.is_completed());
        assert_eq!(quiz.score(), 0);
        assert_eq!(quiz.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_resets_per_question() {
        let mut quiz = session(2);
        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(quiz.is_expired());

        quiz.next();
        assert!(!quiz.is_expired());
        assert_eq!(quiz.time_remaining(), Duration::from_secs(30));
    }
}
