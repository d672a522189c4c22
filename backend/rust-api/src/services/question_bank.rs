use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use validator::Validate;

use crate::error::QuizError;
use crate::models::{Difficulty, Question};

/// Read-only question bank, loaded once at startup and shared for the life
/// of the process.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Arc<Vec<Question>>,
}

impl QuestionBank {
    /// Validates every record; one bad record rejects the whole bank.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        for (index, question) in questions.iter().enumerate() {
            question.validate().map_err(|e| {
                QuizError::InvalidQuestionBank(format!(
                    "question #{} ({} / {}): {}",
                    index, question.category, question.difficulty, e
                ))
            })?;
        }

        Ok(Self {
            questions: Arc::new(questions),
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, QuizError> {
        let questions: Vec<Question> = serde_json::from_str(raw)
            .map_err(|e| QuizError::InvalidQuestionBank(format!("malformed JSON: {}", e)))?;
        Self::new(questions)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, QuizError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            QuizError::InvalidQuestionBank(format!("cannot read {}: {}", path.display(), e))
        })?;
        let bank = Self::from_json(&raw)?;

        tracing::info!(
            "Question bank loaded from {}: {} question(s) in {} categories",
            path.display(),
            bank.len(),
            bank.categories().len()
        );
        Ok(bank)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        for question in self.questions.iter() {
            if !categories.contains(&question.category) {
                categories.push(question.category.clone());
            }
        }
        categories
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.questions.iter().any(|q| q.category == category)
    }

    /// Pool size per tier for one category; tiers with no questions read 0.
    pub fn pool_sizes(&self, category: &str) -> BTreeMap<Difficulty, usize> {
        let mut sizes: BTreeMap<Difficulty, usize> =
            Difficulty::ALL.iter().map(|d| (*d, 0)).collect();
        for question in self.questions.iter().filter(|q| q.category == category) {
            *sizes.entry(question.difficulty).or_default() += 1;
        }
        sizes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::fixtures::choice;

    #[test]
    fn categories_keep_first_seen_order() {
        let bank = QuestionBank::new(vec![
            choice("Phishing", Difficulty::Easy, "a", 5),
            choice("Malware", Difficulty::Easy, "b", 5),
            choice("Phishing", Difficulty::Medium, "c", 10),
        ])
        .unwrap();

        assert_eq!(bank.categories(), vec!["Phishing", "Malware"]);
        assert!(bank.has_category("Malware"));
        assert!(!bank.has_category("Passwords"));

        let sizes = bank.pool_sizes("Phishing");
        assert_eq!(sizes[&Difficulty::Easy], 1);
        assert_eq!(sizes[&Difficulty::Medium], 1);
        assert_eq!(sizes[&Difficulty::Hard], 0);
    }

    #[test]
    fn invalid_record_rejects_bank() {
        let mut broken = choice("Phishing", Difficulty::Easy, "a", 5);
        broken.correct_answer = Some("Not an option".to_string());

        let err = QuestionBank::new(vec![choice("Phishing", Difficulty::Easy, "ok", 5), broken])
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestionBank(ref msg) if msg.contains("#1")));
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = QuestionBank::from_json("[{\"category\": 1}]").unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestionBank(_)));
    }

    #[tokio::test]
    async fn bundled_bank_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/questions.json");
        let bank = QuestionBank::load(path).await.unwrap();
        assert!(!bank.is_empty());
        assert!(bank.has_category("Phishing"));
        let sizes = bank.pool_sizes("Phishing");
        assert!(sizes.values().all(|count| *count >= 3));
    }
}
