use std::sync::Arc;

use crate::error::QuizError;
use crate::metrics::DIFFICULTIES_UNLOCKED_TOTAL;
use crate::models::{Difficulty, DifficultyLock, Progress, UnlockStatus};

use super::store::UserStore;

/// Successor in the easy < medium < hard order.
pub fn next_difficulty(current: Difficulty) -> Option<Difficulty> {
    current.next()
}

/// Lock state of every tier for one category, easiest first.
pub fn lock_states(progress: &Progress, category: &str) -> Vec<DifficultyLock> {
    Difficulty::ALL
        .iter()
        .map(|difficulty| DifficultyLock {
            difficulty: *difficulty,
            unlocked: progress.is_unlocked(category, *difficulty),
        })
        .collect()
}

/// Turns passed attempts into progress-store writes and answers lock queries.
pub struct UnlockService {
    store: Arc<dyn UserStore>,
}

impl UnlockService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Unlocks the tier after `difficulty`. Progress is read once at the start;
    /// if the tier is already there no write is issued.
    pub async fn on_attempt_passed(
        &self,
        user_id: &str,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<UnlockStatus, QuizError> {
        let Some(next) = next_difficulty(difficulty) else {
            tracing::info!("User {} completed category {}", user_id, category);
            return Ok(UnlockStatus::CategoryCompleted);
        };

        let user = self.store.get_user(user_id).await?;
        if user.progress.is_unlocked(category, next) {
            tracing::debug!(
                "{} already unlocked for user {} in {}",
                next,
                user_id,
                category
            );
            return Ok(UnlockStatus::AlreadyUnlocked { difficulty: next });
        }

        let newly = self
            .store
            .unlock_difficulty(user_id, category, next)
            .await?;

        if newly {
            DIFFICULTIES_UNLOCKED_TOTAL
                .with_label_values(&[next.as_str()])
                .inc();
            tracing::info!("Unlocked {} for user {} in {}", next, user_id, category);
            Ok(UnlockStatus::Unlocked { difficulty: next })
        } else {
            // Another writer got there between our read and our write.
            Ok(UnlockStatus::AlreadyUnlocked { difficulty: next })
        }
    }

    pub async fn is_unlocked(
        &self,
        user_id: &str,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<bool, QuizError> {
        if difficulty == Difficulty::Easy {
            return Ok(true);
        }
        let user = self.store.get_user(user_id).await?;
        Ok(user.progress.is_unlocked(category, difficulty))
    }

    pub async fn lock_states(
        &self,
        user_id: &str,
        category: &str,
    ) -> Result<Vec<DifficultyLock>, QuizError> {
        let user = self.store.get_user(user_id).await?;
        Ok(lock_states(&user.progress, category))
    }
}
