use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use validator::{Validate, ValidationError};

/// Difficulty tiers, strictly ordered easy < medium < hard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Successor tier, `None` once at hard.
    pub fn next(&self) -> Option<Difficulty> {
        match self {
            Difficulty::Easy => Some(Difficulty::Medium),
            Difficulty::Medium => Some(Difficulty::Hard),
            Difficulty::Hard => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!("Invalid difficulty: {}", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    Ordering,
    ImageSingle,
    Scenario,
}

/// A single question record from the bank. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_answer_key"))]
pub struct Question {
    #[validate(length(min = 1, message = "Category must not be empty"))]
    pub category: String,
    pub difficulty: Difficulty,
    #[serde(rename = "question_text")]
    #[validate(length(min = 1, message = "Question text must not be empty"))]
    pub text: String,
    #[serde(rename = "question_type")]
    pub kind: QuestionType,
    #[validate(length(min = 1, message = "Question must have options"))]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_order: Option<Vec<String>>,
    #[validate(range(min = 1, message = "Points must be positive"))]
    pub points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_link: Option<String>,
}

/// A player's answer: a single option, or a full sequence for ordering questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AnswerResponse {
    Choice(String),
    Order(Vec<String>),
}

impl Question {
    /// Exact string equality for choice questions, order-sensitive sequence
    /// equality for ordering questions. A response of the wrong shape is
    /// simply incorrect.
    pub fn is_correct(&self, response: &AnswerResponse) -> bool {
        match (self.kind, response) {
            (QuestionType::Ordering, AnswerResponse::Order(order)) => self
                .correct_order
                .as_ref()
                .is_some_and(|expected| expected == order),
            (QuestionType::Ordering, AnswerResponse::Choice(_)) => false,
            (_, AnswerResponse::Choice(choice)) => self
                .correct_answer
                .as_ref()
                .is_some_and(|expected| expected == choice),
            (_, AnswerResponse::Order(_)) => false,
        }
    }

    pub fn has_incident(&self) -> bool {
        self.incident_title.is_some() || self.incident_details.is_some()
    }
}

fn validate_answer_key(question: &Question) -> Result<(), ValidationError> {
    if question.category.contains('.') || question.category.starts_with('$') {
        return Err(ValidationError::new("category_key")
            .with_message("Category must not contain '.' or start with '$'".into()));
    }

    match question.kind {
        QuestionType::Ordering => {
            let order = question.correct_order.as_ref().ok_or_else(|| {
                ValidationError::new("correct_order")
                    .with_message("Ordering question requires correct_order".into())
            })?;
            if order.is_empty() || !order.iter().all(|item| question.options.contains(item)) {
                return Err(ValidationError::new("correct_order")
                    .with_message("Every correct_order entry must be one of the options".into()));
            }
        }
        _ => {
            let answer = question.correct_answer.as_ref().ok_or_else(|| {
                ValidationError::new("correct_answer")
                    .with_message("Question requires correct_answer".into())
            })?;
            if !question.options.contains(answer) {
                return Err(ValidationError::new("correct_answer")
                    .with_message("correct_answer must be one of the options".into()));
            }
        }
    }

    Ok(())
}
