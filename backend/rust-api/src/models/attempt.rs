use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::question::{AnswerResponse, Difficulty, QuestionType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
}

#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub category: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub response: AnswerResponse,
}

/// Question as shown to the player, without its answer key.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub text: String,
    pub kind: QuestionType,
    pub options: Vec<String>,
    pub points: u32,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub category: String,
    pub difficulty: Difficulty,
    pub index: usize,
    pub total: usize,
    pub correct_count: u32,
    pub answered: bool,
    pub complete: bool,
    pub question: Option<QuestionView>,
}

/// Feedback for one submitted answer.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub points: u32,
    pub explanation_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerReport {
    #[serde(flatten)]
    pub feedback: AnswerFeedback,
    pub correct_count: u32,
    /// Authoritative total after the award, when one was made and persisted.
    pub total_score: Option<u64>,
    pub persistence_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnlockStatus {
    /// Failed attempts never unlock anything.
    NotEligible,
    Unlocked { difficulty: Difficulty },
    AlreadyUnlocked { difficulty: Difficulty },
    /// Passed the top tier; nothing left to unlock.
    CategoryCompleted,
    /// The unlock write failed. The returned lock view still shows it
    /// optimistically; the next progress read reconciles with the store.
    Failed { difficulty: Difficulty, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub title: Option<String>,
    pub details: Option<String>,
    pub article_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DifficultyLock {
    pub difficulty: Difficulty,
    pub unlocked: bool,
}

#[derive(Debug, Serialize)]
pub struct CompletionReport {
    pub category: String,
    pub difficulty: Difficulty,
    pub outcome: Outcome,
    pub correct_count: u32,
    pub total: usize,
    pub points_earned: u32,
    pub unlock: UnlockStatus,
    pub games_played: Option<u32>,
    pub incident: Option<Incident>,
    pub difficulties: Vec<DifficultyLock>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub explanation_image: String,
    pub explanation_seen: bool,
    pub question_counts: BTreeMap<Difficulty, usize>,
    pub difficulties: Vec<DifficultyLock>,
}

#[derive(Debug, Serialize)]
pub struct CategoryProgress {
    pub category: String,
    pub difficulties: Vec<DifficultyLock>,
}
