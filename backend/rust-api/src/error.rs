use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::Difficulty;

/// Failures reported by the persistence collaborator. `NotFound` is kept
/// apart from backend failures so callers can tell the two apart.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("No questions available for {category} ({difficulty})")]
    EmptyPool {
        category: String,
        difficulty: Difficulty,
    },

    #[error("Difficulty {difficulty} is locked for {category}")]
    Locked {
        category: String,
        difficulty: Difficulty,
    },

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("No active attempt")]
    NoActiveAttempt,

    /// Contract violation by the caller (answering twice, finalizing early...).
    #[error("Invalid attempt state: {0}")]
    InvalidState(String),

    #[error("Invalid question bank: {0}")]
    InvalidQuestionBank(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl QuizError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        QuizError::InvalidState(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            QuizError::EmptyPool { .. } => StatusCode::NOT_FOUND,
            QuizError::Locked { .. } => StatusCode::FORBIDDEN,
            QuizError::UnknownCategory(_) => StatusCode::NOT_FOUND,
            QuizError::NoActiveAttempt => StatusCode::NOT_FOUND,
            QuizError::InvalidState(_) => StatusCode::CONFLICT,
            QuizError::InvalidQuestionBank(_) => StatusCode::INTERNAL_SERVER_ERROR,
            QuizError::Persistence(PersistenceError::NotFound(_)) => StatusCode::NOT_FOUND,
            QuizError::Persistence(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            QuizError::InvalidState(_) => tracing::error!("Attempt contract violation: {}", self),
            QuizError::Persistence(_) => tracing::error!("Persistence failure: {}", self),
            _ => tracing::debug!("Request rejected: {}", self),
        }

        let body = json!({
            "message": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let empty = QuizError::EmptyPool {
            category: "Phishing".to_string(),
            difficulty: Difficulty::Hard,
        };
        assert_eq!(empty.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            QuizError::invalid_state("answered twice").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            QuizError::from(PersistenceError::NotFound("u1".to_string())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            QuizError::from(PersistenceError::Backend("down".to_string())).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn empty_pool_message_names_the_pool() {
        let err = QuizError::EmptyPool {
            category: "Malware".to_string(),
            difficulty: Difficulty::Easy,
        };
        assert_eq!(err.to_string(), "No questions available for Malware (easy)");
    }
}
