use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::UserStore;
use crate::error::PersistenceError;
use crate::models::{Difficulty, NewUser, User};

/// Offline backend. Every mutation is a read-modify-write under one mutex,
/// and the whole map is rewritten to the JSON file (when configured) before
/// the lock is released. A change only stays in memory once it is on disk.
pub struct LocalUserStore {
    users: Mutex<HashMap<String, User>>,
    path: Option<PathBuf>,
}

impl LocalUserStore {
    pub fn in_memory() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            path: None,
        }
    }

    /// Opens the store file, starting empty if it does not exist yet. A file
    /// that cannot be parsed is reported rather than silently discarded.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let users = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => {
                let list: Vec<User> = serde_json::from_slice(&bytes)?;
                list.into_iter().map(|user| (user.id.clone(), user)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Local store {} not found, starting empty", path.display());
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            "Local store opened at {} with {} user(s)",
            path.display(),
            users.len()
        );

        Ok(Self {
            users: Mutex::new(users),
            path: Some(path),
        })
    }

    async fn flush(&self, users: &HashMap<String, User>) -> Result<(), PersistenceError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut list: Vec<&User> = users.values().collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        let json = serde_json::to_vec_pretty(&list)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Stores `user` and flushes. Restores the previous entry if the flush fails.
    async fn commit(
        &self,
        users: &mut HashMap<String, User>,
        user: User,
    ) -> Result<(), PersistenceError> {
        let user_id = user.id.clone();
        let previous = users.insert(user_id.clone(), user);

        if let Err(e) = self.flush(users).await {
            tracing::error!("Local store write failed for {}: {}", user_id, e);
            match previous {
                Some(previous) => users.insert(user_id, previous),
                None => users.remove(&user_id),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Applies `f` to a copy of the user under the lock and commits it.
    async fn mutate<T: Send>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut User) -> T + Send,
    ) -> Result<T, PersistenceError> {
        let mut users = self.users.lock().await;
        let mut user = users
            .get(user_id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(user_id.to_string()))?;
        let result = f(&mut user);
        self.commit(&mut users, user).await?;
        Ok(result)
    }
}

impl Default for LocalUserStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[async_trait]
impl UserStore for LocalUserStore {
    async fn get_user(&self, user_id: &str) -> Result<User, PersistenceError> {
        let users = self.users.lock().await;
        users
            .get(user_id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(user_id.to_string()))
    }

    async fn ensure_user(&self, new_user: NewUser) -> Result<User, PersistenceError> {
        let mut users = self.users.lock().await;
        if let Some(existing) = users.get(&new_user.id) {
            return Ok(existing.clone());
        }

        let user = new_user.into_user();
        tracing::info!("Creating player record {} ({})", user.id, user.username);
        self.commit(&mut users, user.clone()).await?;
        Ok(user)
    }

    async fn increment_score(&self, user_id: &str, delta: u32) -> Result<u64, PersistenceError> {
        self.mutate(user_id, |user| {
            user.score += u64::from(delta);
            user.score
        })
        .await
    }

    async fn unlock_difficulty(
        &self,
        user_id: &str,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<bool, PersistenceError> {
        let mut users = self.users.lock().await;
        let mut user = users
            .get(user_id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(user_id.to_string()))?;

        if !user.progress.unlock(category, difficulty) {
            return Ok(false);
        }
        self.commit(&mut users, user).await?;
        Ok(true)
    }

    async fn increment_games_played(&self, user_id: &str) -> Result<u32, PersistenceError> {
        self.mutate(user_id, |user| {
            user.games_played += 1;
            user.games_played
        })
        .await
    }

    async fn mark_explanation_seen(
        &self,
        user_id: &str,
        category: &str,
    ) -> Result<(), PersistenceError> {
        let category = category.to_string();
        self.mutate(user_id, move |user| {
            user.seen_explanations.insert(category, true);
        })
        .await
    }

    async fn mark_welcome_seen(&self, user_id: &str) -> Result<(), PersistenceError> {
        self.mutate(user_id, |user| user.has_seen_welcome = true).await
    }

    async fn leaderboard(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<User>, PersistenceError> {
        let users = self.users.lock().await;
        let mut list: Vec<&User> = users.values().collect();
        list.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.username.cmp(&b.username)));
        Ok(list.into_iter().skip(offset).take(limit).cloned().collect())
    }

    async fn count_users(&self) -> Result<u64, PersistenceError> {
        Ok(self.users.lock().await.len() as u64)
    }

    async fn rank_of(&self, user_id: &str) -> Result<u64, PersistenceError> {
        let users = self.users.lock().await;
        let score = users
            .get(user_id)
            .map(|user| user.score)
            .ok_or_else(|| PersistenceError::NotFound(user_id.to_string()))?;
        let ahead = users.values().filter(|user| user.score > score).count();
        Ok(ahead as u64 + 1)
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
