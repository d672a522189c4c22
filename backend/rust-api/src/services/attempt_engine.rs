use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, Rng};

use crate::error::QuizError;
use crate::models::{
    AnswerFeedback, AnswerResponse, AttemptView, Difficulty, Incident, Outcome, Question,
    QuestionType, QuestionView,
};

/// Questions drawn per attempt.
pub const ATTEMPT_SIZE: usize = 3;
/// Correct answers needed to pass. Fixed, independent of pool size.
pub const PASS_THRESHOLD: u32 = 2;

/// One in-flight run through a sampled question set. Lives only in memory;
/// only its outcome is ever persisted.
#[derive(Debug, Clone)]
pub struct Attempt {
    category: String,
    difficulty: Difficulty,
    questions: Vec<Question>,
    /// Option order shown to the player, fixed for the whole attempt.
    display_options: Vec<Vec<String>>,
    current_index: usize,
    correct_count: u32,
    answered: bool,
    points_earned: u32,
    started_at: DateTime<Utc>,
}

impl Outcome {
    pub fn from_correct_count(correct_count: u32) -> Self {
        if correct_count >= PASS_THRESHOLD {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass)
    }
}

/// Starts an attempt using the thread-local RNG.
pub fn start_attempt(
    category: &str,
    difficulty: Difficulty,
    bank: &[Question],
) -> Result<Attempt, QuizError> {
    start_attempt_with_rng(category, difficulty, bank, &mut rand::rng())
}

/// Filters the bank down to the (category, difficulty) pool, shuffles it
/// (Fisher-Yates) and keeps the first `ATTEMPT_SIZE` questions. Choice
/// options are shuffled too; ordering options keep their bank order.
pub fn start_attempt_with_rng<R: Rng + ?Sized>(
    category: &str,
    difficulty: Difficulty,
    bank: &[Question],
    rng: &mut R,
) -> Result<Attempt, QuizError> {
    let mut pool: Vec<Question> = bank
        .iter()
        .filter(|q| q.category == category && q.difficulty == difficulty)
        .cloned()
        .collect();

    if pool.is_empty() {
        return Err(QuizError::EmptyPool {
            category: category.to_string(),
            difficulty,
        });
    }

    pool.shuffle(rng);
    pool.truncate(ATTEMPT_SIZE);

    let mut display_options = Vec::with_capacity(pool.len());
    for question in &pool {
        let mut options = question.options.clone();
        if question.kind != QuestionType::Ordering {
            options.shuffle(rng);
        }
        display_options.push(options);
    }

    tracing::debug!(
        "Sampled {} question(s) for {} ({})",
        pool.len(),
        category,
        difficulty
    );

    Ok(Attempt {
        category: category.to_string(),
        difficulty,
        questions: pool,
        display_options,
        current_index: 0,
        correct_count: 0,
        answered: false,
        points_earned: 0,
        started_at: Utc::now(),
    })
}

impl Attempt {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    pub fn points_earned(&self) -> u32 {
        self.points_earned
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whether the question under the cursor already has an answer.
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    /// Question under the cursor, `None` once every slot is consumed.
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    /// Checks the response against the current question. Does not move the
    /// cursor. One submission per slot.
    pub fn submit_answer(&mut self, response: &AnswerResponse) -> Result<AnswerFeedback, QuizError> {
        if self.answered {
            return Err(QuizError::invalid_state(format!(
                "question {} was already answered",
                self.current_index + 1
            )));
        }
        let question = self
            .current_question()
            .ok_or_else(|| QuizError::invalid_state("attempt is already complete"))?;

        let correct = question.is_correct(response);
        let feedback = AnswerFeedback {
            correct,
            points: if correct { question.points } else { 0 },
            explanation_image: if correct {
                question.explanation_image.clone()
            } else {
                None
            },
        };

        if correct {
            self.correct_count += 1;
            self.points_earned += feedback.points;
        }
        self.answered = true;

        Ok(feedback)
    }

    /// Moves the cursor to the next slot. The current slot must be answered.
    pub fn advance(&mut self) -> Result<(), QuizError> {
        if self.is_complete() {
            return Err(QuizError::invalid_state("attempt is already complete"));
        }
        if !self.answered {
            return Err(QuizError::invalid_state(format!(
                "question {} has not been answered",
                self.current_index + 1
            )));
        }
        self.current_index += 1;
        self.answered = false;
        Ok(())
    }

    /// Pass/fail, defined only once the attempt is complete.
    pub fn outcome(&self) -> Result<Outcome, QuizError> {
        if !self.is_complete() {
            return Err(QuizError::invalid_state(format!(
                "outcome requested at question {} of {}",
                self.current_index + 1,
                self.questions.len()
            )));
        }
        Ok(Outcome::from_correct_count(self.correct_count))
    }

    /// Incident case study shown after a failed attempt.
    pub fn incident(&self) -> Option<Incident> {
        self.questions
            .iter()
            .find(|q| q.has_incident())
            .map(|q| Incident {
                title: q.incident_title.clone(),
                details: q.incident_details.clone(),
                article_link: q.article_link.clone(),
            })
    }

    pub fn view(&self) -> AttemptView {
        AttemptView {
            category: self.category.clone(),
            difficulty: self.difficulty,
            index: self.current_index,
            total: self.questions.len(),
            correct_count: self.correct_count,
            answered: self.answered,
            complete: self.is_complete(),
            question: self.current_question().map(|q| QuestionView {
                text: q.text.clone(),
                kind: q.kind,
                options: self
                    .display_options
                    .get(self.current_index)
                    .cloned()
                    .unwrap_or_else(|| q.options.clone()),
                points: q.points,
                image: q.image.clone(),
            }),
        }
    }
}
