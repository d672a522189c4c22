//! Persistence collaborator for player records.
//!
//! Two interchangeable backends: a MongoDB document store and a local store
//! (in-process map mirrored to a JSON file). The attempt, unlock and score
//! services only see the [`UserStore`] trait.

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::models::{Difficulty, NewUser, User};

pub mod local;
pub mod mongo;
#[cfg(test)]
pub(crate) mod testing;

pub use local::LocalUserStore;
pub use mongo::MongoUserStore;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<User, PersistenceError>;

    /// Creates the record with defaults if missing; returns the stored record.
    async fn ensure_user(&self, new_user: NewUser) -> Result<User, PersistenceError>;

    /// Atomic increment. Returns the new total.
    async fn increment_score(&self, user_id: &str, delta: u32) -> Result<u64, PersistenceError>;

    /// Adds `difficulty` to the unlocked set of `category`. Returns true if
    /// it was not present before. Never removes entries.
    async fn unlock_difficulty(
        &self,
        user_id: &str,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<bool, PersistenceError>;

    /// Returns the new count.
    async fn increment_games_played(&self, user_id: &str) -> Result<u32, PersistenceError>;

    async fn mark_explanation_seen(&self, user_id: &str, category: &str)
        -> Result<(), PersistenceError>;

    async fn mark_welcome_seen(&self, user_id: &str) -> Result<(), PersistenceError>;

    /// Players ordered by score (highest first, then username), skipping
    /// the first `offset`.
    async fn leaderboard(&self, offset: usize, limit: usize)
        -> Result<Vec<User>, PersistenceError>;

    async fn count_users(&self) -> Result<u64, PersistenceError>;

    /// 1 + number of players with a strictly higher score.
    async fn rank_of(&self, user_id: &str) -> Result<u64, PersistenceError>;

    async fn ping(&self) -> Result<(), PersistenceError>;

    fn backend_name(&self) -> &'static str;
}
