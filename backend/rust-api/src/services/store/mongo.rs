use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Collection, Database,
};

use super::UserStore;
use crate::error::PersistenceError;
use crate::metrics::track_db_operation;
use crate::models::{Difficulty, NewUser, User};

const USERS_COLLECTION: &str = "users";

/// Document-store backend. Score and counters use `$inc`, unlocks use a
/// dot-path `$addToSet`, so concurrent writes to one record never lose
/// updates.
pub struct MongoUserStore {
    db: Database,
    users: Collection<User>,
}

impl MongoUserStore {
    pub fn new(db: Database) -> Self {
        let users = db.collection::<User>(USERS_COLLECTION);
        Self { db, users }
    }

    fn after_update() -> FindOneAndUpdateOptions {
        FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build()
    }

    async fn increment_field(
        &self,
        user_id: &str,
        field: &str,
        delta: i64,
    ) -> Result<User, PersistenceError> {
        track_db_operation("find_one_and_update", USERS_COLLECTION, async {
            self.users
                .find_one_and_update(doc! { "_id": user_id }, doc! { "$inc": { field: delta } })
                .with_options(Self::after_update())
                .await?
                .ok_or_else(|| PersistenceError::NotFound(user_id.to_string()))
        })
        .await
    }

    async fn set_flag(&self, user_id: &str, field: String) -> Result<(), PersistenceError> {
        let result = track_db_operation("update_one", USERS_COLLECTION, async {
            self.users
                .update_one(doc! { "_id": user_id }, doc! { "$set": { field: true } })
                .await
                .map_err(PersistenceError::from)
        })
        .await?;

        if result.matched_count == 0 {
            return Err(PersistenceError::NotFound(user_id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn get_user(&self, user_id: &str) -> Result<User, PersistenceError> {
        track_db_operation("find_one", USERS_COLLECTION, async {
            self.users
                .find_one(doc! { "_id": user_id })
                .await?
                .ok_or_else(|| PersistenceError::NotFound(user_id.to_string()))
        })
        .await
    }

    async fn ensure_user(&self, new_user: NewUser) -> Result<User, PersistenceError> {
        let user_id = new_user.id.clone();
        let mut defaults: Document = mongodb::bson::to_document(&new_user.into_user())
            .map_err(|e| PersistenceError::Backend(format!("Failed to encode user: {}", e)))?;
        defaults.remove("_id");

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        track_db_operation("find_one_and_update", USERS_COLLECTION, async {
            self.users
                .find_one_and_update(doc! { "_id": user_id.as_str() }, doc! { "$setOnInsert": defaults })
                .with_options(options)
                .await?
                .ok_or_else(|| {
                    PersistenceError::Backend(format!("Upsert returned no document for {}", user_id))
                })
        })
        .await
    }

    async fn increment_score(&self, user_id: &str, delta: u32) -> Result<u64, PersistenceError> {
        let user = self
            .increment_field(user_id, "score", i64::from(delta))
            .await?;
        Ok(user.score)
    }

    async fn unlock_difficulty(
        &self,
        user_id: &str,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<bool, PersistenceError> {
        if difficulty == Difficulty::Easy {
            return Ok(false);
        }

        let field = format!("progress.{}", category);
        let result = track_db_operation("update_one", USERS_COLLECTION, async {
            self.users
                .update_one(
                    doc! { "_id": user_id },
                    doc! { "$addToSet": { field: difficulty.as_str() } },
                )
                .await
                .map_err(PersistenceError::from)
        })
        .await?;

        if result.matched_count == 0 {
            return Err(PersistenceError::NotFound(user_id.to_string()));
        }
        Ok(result.modified_count > 0)
    }

    async fn increment_games_played(&self, user_id: &str) -> Result<u32, PersistenceError> {
        let user = self.increment_field(user_id, "gamesPlayed", 1).await?;
        Ok(user.games_played)
    }

    async fn mark_explanation_seen(
        &self,
        user_id: &str,
        category: &str,
    ) -> Result<(), PersistenceError> {
        self.set_flag(user_id, format!("seenExplanations.{}", category))
            .await
    }

    async fn mark_welcome_seen(&self, user_id: &str) -> Result<(), PersistenceError> {
        self.set_flag(user_id, "hasSeenWelcome".to_string()).await
    }

    async fn leaderboard(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<User>, PersistenceError> {
        let options = FindOptions::builder()
            .sort(doc! { "score": -1, "username": 1 })
            .skip(offset as u64)
            .limit(limit as i64)
            .build();

        track_db_operation("find", USERS_COLLECTION, async {
            let mut cursor = self.users.find(doc! {}).with_options(options).await?;
            let mut users = Vec::new();
            while let Some(user) = cursor.try_next().await? {
                users.push(user);
            }
            Ok::<_, PersistenceError>(users)
        })
        .await
    }

    async fn count_users(&self) -> Result<u64, PersistenceError> {
        track_db_operation("count_documents", USERS_COLLECTION, async {
            self.users
                .count_documents(doc! {})
                .await
                .map_err(PersistenceError::from)
        })
        .await
    }

    async fn rank_of(&self, user_id: &str) -> Result<u64, PersistenceError> {
        let user = self.get_user(user_id).await?;
        let ahead = track_db_operation("count_documents", USERS_COLLECTION, async {
            self.users
                .count_documents(doc! { "score": { "$gt": user.score as i64 } })
                .await
                .map_err(PersistenceError::from)
        })
        .await?;
        Ok(ahead + 1)
    }

    async fn ping(&self) -> Result<(), PersistenceError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

/// Run against a live server: `MONGO_URI=mongodb://localhost:27017 cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn scratch_store() -> (MongoUserStore, Database) {
        let uri = std::env::var("MONGO_URI").expect("MONGO_URI must be set for mongo tests");
        let client = mongodb::Client::with_uri_str(&uri).await.unwrap();
        let db = client.database(&format!("cyberquiz_test_{}", uuid::Uuid::new_v4().simple()));
        (MongoUserStore::new(db.clone()), db)
    }

    fn new_user(id: &str) -> NewUser {
        NewUser {
            id: id.to_string(),
            username: Some(id.to_string()),
            email: None,
        }
    }

    #[tokio::test]
    #[ignore = "requires MONGO_URI"]
    async fn upsert_keeps_existing_record() {
        let (store, db) = scratch_store().await;

        let created = store.ensure_user(new_user("u1")).await.unwrap();
        assert_eq!(created.score, 0);
        assert_eq!(store.increment_score("u1", 15).await.unwrap(), 15);

        let again = store.ensure_user(new_user("u1")).await.unwrap();
        assert_eq!(again.score, 15);
        assert!(matches!(
            store.get_user("ghost").await,
            Err(PersistenceError::NotFound(_))
        ));

        db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires MONGO_URI"]
    async fn concurrent_increments_are_not_lost() {
        let (store, db) = scratch_store().await;
        let store = Arc::new(store);
        store.ensure_user(new_user("u1")).await.unwrap();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_score("u1", 5).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.get_user("u1").await.unwrap().score, 50);
        assert_eq!(store.increment_games_played("u1").await.unwrap(), 1);

        db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires MONGO_URI"]
    async fn unlock_uses_set_semantics() {
        let (store, db) = scratch_store().await;
        store.ensure_user(new_user("u1")).await.unwrap();

        assert!(store
            .unlock_difficulty("u1", "Social Engineering", Difficulty::Medium)
            .await
            .unwrap());
        assert!(!store
            .unlock_difficulty("u1", "Social Engineering", Difficulty::Medium)
            .await
            .unwrap());
        assert!(matches!(
            store
                .unlock_difficulty("ghost", "Phishing", Difficulty::Medium)
                .await,
            Err(PersistenceError::NotFound(_))
        ));

        store
            .mark_explanation_seen("u1", "Social Engineering")
            .await
            .unwrap();
        let user = store.get_user("u1").await.unwrap();
        assert!(user
            .progress
            .is_unlocked("Social Engineering", Difficulty::Medium));
        assert!(!user.progress.is_unlocked("Social Engineering", Difficulty::Hard));
        assert!(user.has_seen_explanation("Social Engineering"));

        db.drop().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires MONGO_URI"]
    async fn leaderboard_pages_and_ranks() {
        let (store, db) = scratch_store().await;
        for (id, score) in [("a", 30), ("b", 20), ("c", 20), ("d", 5)] {
            store.ensure_user(new_user(id)).await.unwrap();
            store.increment_score(id, score).await.unwrap();
        }

        let ids = |users: Vec<User>| users.into_iter().map(|u| u.id).collect::<Vec<_>>();
        assert_eq!(ids(store.leaderboard(0, 3).await.unwrap()), vec!["a", "b", "c"]);
        assert_eq!(ids(store.leaderboard(2, 10).await.unwrap()), vec!["c", "d"]);
        assert_eq!(store.count_users().await.unwrap(), 4);

        assert_eq!(store.rank_of("a").await.unwrap(), 1);
        assert_eq!(store.rank_of("c").await.unwrap(), 2);
        assert_eq!(store.rank_of("d").await.unwrap(), 4);
        store.ping().await.unwrap();

        db.drop().await.unwrap();
    }
}
