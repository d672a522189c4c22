use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::question::Difficulty;

/// Player record stored in the "users" collection (or the local store file).
/// Field names follow the document layout the web client already reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub score: u64,
    #[serde(rename = "gamesPlayed", default)]
    pub games_played: u32,
    #[serde(default)]
    pub progress: Progress,
    #[serde(rename = "seenExplanations", default)]
    pub seen_explanations: BTreeMap<String, bool>,
    #[serde(rename = "hasSeenWelcome", default)]
    pub has_seen_welcome: bool,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(rename = "createdAt", default = "Utc::now", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: Option<String>) -> Self {
        User {
            id: id.into(),
            username: username.into(),
            email,
            score: 0,
            games_played: 0,
            progress: Progress::default(),
            seen_explanations: BTreeMap::new(),
            has_seen_welcome: false,
            photo_url: None,
            created_at: Utc::now(),
        }
    }

    pub fn has_seen_explanation(&self, category: &str) -> bool {
        self.seen_explanations.get(category).copied().unwrap_or(false)
    }
}

/// Identity fields handed over by the identity provider on first sight.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl NewUser {
    /// Falls back to the email local part, then to a generic handle.
    pub fn display_name(&self) -> String {
        self.username
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .filter(|local| !local.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "Agent".to_string())
    }

    pub fn into_user(self) -> User {
        let username = self.display_name();
        User::new(self.id, username, self.email)
    }
}

/// Unlocked difficulties per category. Easy is implied and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>")]
pub struct Progress(BTreeMap<String, BTreeSet<Difficulty>>);

impl From<BTreeMap<String, Vec<String>>> for Progress {
    fn from(raw: BTreeMap<String, Vec<String>>) -> Self {
        let mut progress = BTreeMap::new();
        for (category, values) in raw {
            let mut unlocked = BTreeSet::new();
            for value in values {
                match value.parse::<Difficulty>() {
                    Ok(difficulty) => {
                        unlocked.insert(difficulty);
                    }
                    Err(_) => tracing::warn!(
                        "Dropping unknown difficulty '{}' stored for category {}",
                        value,
                        category
                    ),
                }
            }
            progress.insert(category, unlocked);
        }
        Progress(progress)
    }
}

impl Progress {
    pub fn is_unlocked(&self, category: &str, difficulty: Difficulty) -> bool {
        difficulty == Difficulty::Easy
            || self
                .0
                .get(category)
                .is_some_and(|unlocked| unlocked.contains(&difficulty))
    }

    /// All unlocked tiers for a category, easy included.
    pub fn unlocked(&self, category: &str) -> BTreeSet<Difficulty> {
        let mut unlocked = self.0.get(category).cloned().unwrap_or_default();
        unlocked.insert(Difficulty::Easy);
        unlocked
    }

    /// Returns true if the tier was not unlocked before. The set only grows.
    pub fn unlock(&mut self, category: &str, difficulty: Difficulty) -> bool {
        if self.is_unlocked(category, difficulty) {
            return false;
        }
        self.0
            .entry(category.to_string())
            .or_default()
            .insert(difficulty)
    }
}

/// Public profile returned to the client
#[derive(Debug, Serialize)]
pub struct PlayerProfile {
    pub id: String,
    pub username: String,
    pub score: u64,
    pub games_played: u32,
    pub rank: u64,
    pub has_seen_welcome: bool,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u64,
    pub username: String,
    pub score: u64,
    pub photo_url: Option<String>,
    pub is_current_user: bool,
}

/// One page of the leaderboard. Pages are 1-based.
#[derive(Debug, Serialize)]
pub struct LeaderboardPage {
    pub page: usize,
    pub per_page: usize,
    pub total_players: u64,
    pub total_pages: u64,
    pub entries: Vec<LeaderboardEntry>,
}

// Serde converter for chrono::DateTime <-> mongodb::bson::DateTime
pub(super) mod bson_datetime_as_chrono {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bson_dt = bson::DateTime::from_millis(date.timestamp_millis());
        bson_dt.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bson_dt = bson::DateTime::deserialize(deserializer)?;
        DateTime::from_timestamp_millis(bson_dt.timestamp_millis())
            .ok_or_else(|| serde::de::Error::custom("createdAt out of range"))
    }
}
