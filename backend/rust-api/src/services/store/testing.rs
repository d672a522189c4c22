//! Test double wrapping the local store with write counters and switchable
//! failures.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{LocalUserStore, UserStore};
use crate::error::PersistenceError;
use crate::models::{Difficulty, NewUser, User};

#[derive(Default)]
pub struct FlakyStore {
    inner: LocalUserStore,
    pub unlock_writes: AtomicUsize,
    pub score_writes: AtomicUsize,
    pub fail_unlocks: AtomicBool,
    pub fail_scores: AtomicBool,
    pub fail_games_played: AtomicBool,
}

impl FlakyStore {
    pub async fn with_user(user_id: &str) -> Self {
        let store = Self::default();
        store
            .inner
            .ensure_user(NewUser {
                id: user_id.to_string(),
                username: Some("neo".to_string()),
                email: None,
            })
            .await
            .unwrap();
        store
    }

    fn rejected(flag: &AtomicBool) -> Result<(), PersistenceError> {
        if flag.load(Ordering::SeqCst) {
            Err(PersistenceError::Backend("write rejected".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserStore for FlakyStore {
    async fn get_user(&self, user_id: &str) -> Result<User, PersistenceError> {
        self.inner.get_user(user_id).await
    }

    async fn ensure_user(&self, new_user: NewUser) -> Result<User, PersistenceError> {
        self.inner.ensure_user(new_user).await
    }

    async fn increment_score(&self, user_id: &str, delta: u32) -> Result<u64, PersistenceError> {
        self.score_writes.fetch_add(1, Ordering::SeqCst);
        Self::rejected(&self.fail_scores)?;
        self.inner.increment_score(user_id, delta).await
    }

    async fn unlock_difficulty(
        &self,
        user_id: &str,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<bool, PersistenceError> {
        self.unlock_writes.fetch_add(1, Ordering::SeqCst);
        Self::rejected(&self.fail_unlocks)?;
        self.inner
            .unlock_difficulty(user_id, category, difficulty)
            .await
    }

    async fn increment_games_played(&self, user_id: &str) -> Result<u32, PersistenceError> {
        Self::rejected(&self.fail_games_played)?;
        self.inner.increment_games_played(user_id).await
    }

    async fn mark_explanation_seen(
        &self,
        user_id: &str,
        category: &str,
    ) -> Result<(), PersistenceError> {
        self.inner.mark_explanation_seen(user_id, category).await
    }

    async fn mark_welcome_seen(&self, user_id: &str) -> Result<(), PersistenceError> {
        self.inner.mark_welcome_seen(user_id).await
    }

    async fn leaderboard(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<User>, PersistenceError> {
        self.inner.leaderboard(offset, limit).await
    }

    async fn count_users(&self) -> Result<u64, PersistenceError> {
        self.inner.count_users().await
    }

    async fn rank_of(&self, user_id: &str) -> Result<u64, PersistenceError> {
        self.inner.rank_of(user_id).await
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}
