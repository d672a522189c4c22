use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::QuizError;
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, ATTEMPTS_ACTIVE, ATTEMPTS_TOTAL};
use crate::models::{
    AnswerReport, AnswerResponse, AttemptView, CategoryProgress, CategorySummary,
    CompletionReport, Difficulty, LeaderboardEntry, LeaderboardPage, NewUser, Outcome, PlayerProfile, Progress,
    UnlockStatus, User,
};

use super::attempt_engine::{self, Attempt};
use super::question_bank::QuestionBank;
use super::score_service::ScoreService;
use super::store::UserStore;
use super::unlock_service::{self, UnlockService};

/// Image shown before the first game of a category.
pub fn explanation_image(category: &str) -> String {
    let slug = category
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    format!("images/{}-explain.png", slug)
}

/// Drives the game flow: one in-flight attempt per player, kept in memory,
/// with scores, games played and unlocks written through the store.
pub struct GameService {
    bank: QuestionBank,
    store: Arc<dyn UserStore>,
    unlocks: UnlockService,
    scores: ScoreService,
    attempts: RwLock<HashMap<String, Attempt>>,
}

impl GameService {
    pub fn new(bank: QuestionBank, store: Arc<dyn UserStore>) -> Self {
        Self {
            unlocks: UnlockService::new(store.clone()),
            scores: ScoreService::new(store.clone()),
            bank,
            store,
            attempts: RwLock::new(HashMap::new()),
        }
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    fn require_category(&self, category: &str) -> Result<(), QuizError> {
        if self.bank.has_category(category) {
            Ok(())
        } else {
            Err(QuizError::UnknownCategory(category.to_string()))
        }
    }

    pub async fn ensure_player(&self, new_user: NewUser) -> Result<User, QuizError> {
        Ok(self.store.ensure_user(new_user).await?)
    }

    pub async fn profile(&self, user_id: &str) -> Result<PlayerProfile, QuizError> {
        let user = self.store.get_user(user_id).await?;
        let rank = self.store.rank_of(user_id).await?;

        Ok(PlayerProfile {
            id: user.id,
            username: user.username,
            score: user.score,
            games_played: user.games_played,
            rank,
            has_seen_welcome: user.has_seen_welcome,
            photo_url: user.photo_url,
        })
    }

    /// Players by score, `per_page` at a time. Equal scores share a rank,
    /// including across page boundaries.
    pub async fn leaderboard(
        &self,
        user_id: &str,
        page: usize,
        per_page: usize,
    ) -> Result<LeaderboardPage, QuizError> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page - 1).saturating_mul(per_page);

        let total_players = self.store.count_users().await?;
        let users = self.store.leaderboard(offset, per_page).await?;

        let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(users.len());
        for (position, user) in users.into_iter().enumerate() {
            let rank = match entries.last() {
                Some(previous) if previous.score == user.score => previous.rank,
                // A tie may start on an earlier page.
                None if offset > 0 => self.store.rank_of(&user.id).await?,
                _ => (offset + position) as u64 + 1,
            };
            entries.push(LeaderboardEntry {
                rank,
                is_current_user: user.id == user_id,
                username: user.username,
                score: user.score,
                photo_url: user.photo_url,
            });
        }

        Ok(LeaderboardPage {
            page,
            per_page,
            total_players,
            total_pages: total_players.div_ceil(per_page as u64),
            entries,
        })
    }

    pub async fn categories(&self, user_id: &str) -> Result<Vec<CategorySummary>, QuizError> {
        let user = self.store.get_user(user_id).await?;

        Ok(self
            .bank
            .categories()
            .into_iter()
            .map(|name| CategorySummary {
                explanation_image: explanation_image(&name),
                explanation_seen: user.has_seen_explanation(&name),
                question_counts: self.bank.pool_sizes(&name),
                difficulties: unlock_service::lock_states(&user.progress, &name),
                name,
            })
            .collect())
    }

    pub async fn category_progress(
        &self,
        user_id: &str,
        category: &str,
    ) -> Result<CategoryProgress, QuizError> {
        self.require_category(category)?;
        let difficulties = self.unlocks.lock_states(user_id, category).await?;
        Ok(CategoryProgress {
            category: category.to_string(),
            difficulties,
        })
    }

    pub async fn mark_explanation_seen(
        &self,
        user_id: &str,
        category: &str,
    ) -> Result<(), QuizError> {
        self.require_category(category)?;
        self.store.mark_explanation_seen(user_id, category).await?;
        Ok(())
    }

    pub async fn mark_welcome_seen(&self, user_id: &str) -> Result<(), QuizError> {
        self.store.mark_welcome_seen(user_id).await?;
        Ok(())
    }

    /// Starts a new attempt, replacing any attempt the player still had open.
    pub async fn start(
        &self,
        user_id: &str,
        category: &str,
        difficulty: Difficulty,
    ) -> Result<AttemptView, QuizError> {
        self.require_category(category)?;

        if !self.unlocks.is_unlocked(user_id, category, difficulty).await? {
            tracing::warn!(
                "User {} tried to start locked tier {} in {}",
                user_id,
                difficulty,
                category
            );
            return Err(QuizError::Locked {
                category: category.to_string(),
                difficulty,
            });
        }

        let attempt = attempt_engine::start_attempt(category, difficulty, self.bank.questions())?;
        let view = attempt.view();

        let replaced = self
            .attempts
            .write()
            .await
            .insert(user_id.to_string(), attempt);

        if replaced.is_some() {
            ATTEMPTS_TOTAL.with_label_values(&["abandoned"]).inc();
            tracing::info!("User {} replaced an unfinished attempt", user_id);
        } else {
            ATTEMPTS_ACTIVE.inc();
        }
        ATTEMPTS_TOTAL.with_label_values(&["started"]).inc();

        tracing::info!(
            "User {} started {} ({}) with {} question(s)",
            user_id,
            category,
            difficulty,
            view.total
        );
        Ok(view)
    }

    pub async fn current(&self, user_id: &str) -> Result<AttemptView, QuizError> {
        self.attempts
            .read()
            .await
            .get(user_id)
            .map(Attempt::view)
            .ok_or(QuizError::NoActiveAttempt)
    }

    /// Records the answer and awards points for a correct one. A failed
    /// award keeps the answer recorded and is reported back.
    pub async fn submit(
        &self,
        user_id: &str,
        response: &AnswerResponse,
    ) -> Result<AnswerReport, QuizError> {
        let (feedback, correct_count) = {
            let mut attempts = self.attempts.write().await;
            let attempt = attempts.get_mut(user_id).ok_or(QuizError::NoActiveAttempt)?;
            let feedback = attempt.submit_answer(response)?;
            (feedback, attempt.correct_count())
        };

        ANSWERS_SUBMITTED_TOTAL
            .with_label_values(&[if feedback.correct { "true" } else { "false" }])
            .inc();

        let mut report = AnswerReport {
            feedback,
            correct_count,
            total_score: None,
            persistence_error: None,
        };

        if report.feedback.points > 0 {
            match self.scores.award(user_id, report.feedback.points).await {
                Ok(total) => report.total_score = Some(total),
                Err(e) => {
                    tracing::error!("Failed to award points to {}: {}", user_id, e);
                    report.persistence_error = Some(e.to_string());
                }
            }
        }

        Ok(report)
    }

    pub async fn advance(&self, user_id: &str) -> Result<AttemptView, QuizError> {
        let mut attempts = self.attempts.write().await;
        let attempt = attempts.get_mut(user_id).ok_or(QuizError::NoActiveAttempt)?;
        attempt.advance()?;
        Ok(attempt.view())
    }

    /// Drops the attempt without touching the store.
    pub async fn abandon(&self, user_id: &str) -> Result<(), QuizError> {
        self.attempts
            .write()
            .await
            .remove(user_id)
            .ok_or(QuizError::NoActiveAttempt)?;

        ATTEMPTS_ACTIVE.dec();
        ATTEMPTS_TOTAL.with_label_values(&["abandoned"]).inc();
        tracing::info!("User {} abandoned their attempt", user_id);
        Ok(())
    }

    /// Finalizes a complete attempt. Persistence failures after this point
    /// do not fail the call; they show up in the report.
    pub async fn complete(&self, user_id: &str) -> Result<CompletionReport, QuizError> {
        let attempt = {
            let mut attempts = self.attempts.write().await;
            let attempt = attempts.get(user_id).ok_or(QuizError::NoActiveAttempt)?;
            attempt.outcome()?;
            attempts.remove(user_id).ok_or(QuizError::NoActiveAttempt)?
        };
        ATTEMPTS_ACTIVE.dec();

        let outcome = attempt.outcome()?;
        let category = attempt.category().to_string();
        let difficulty = attempt.difficulty();
        let mut warnings = Vec::new();

        ATTEMPTS_TOTAL
            .with_label_values(&[if outcome.is_pass() { "passed" } else { "failed" }])
            .inc();

        let games_played = match self.store.increment_games_played(user_id).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::error!("Failed to record game for {}: {}", user_id, e);
                warnings.push(format!("games played not recorded: {}", e));
                None
            }
        };

        let unlock = match outcome {
            Outcome::Fail => UnlockStatus::NotEligible,
            Outcome::Pass => match self
                .unlocks
                .on_attempt_passed(user_id, &category, difficulty)
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!(
                        "Failed to persist unlock for {} in {}: {}",
                        user_id,
                        category,
                        e
                    );
                    match difficulty.next() {
                        Some(next) => UnlockStatus::Failed {
                            difficulty: next,
                            error: e.to_string(),
                        },
                        None => UnlockStatus::CategoryCompleted,
                    }
                }
            },
        };

        let mut progress = match self.store.get_user(user_id).await {
            Ok(user) => user.progress,
            Err(e) => {
                tracing::warn!("Could not reload progress for {}: {}", user_id, e);
                warnings.push(format!("progress not reloaded: {}", e));
                Progress::default()
            }
        };
        // Shown as unlocked even if the write failed; the next read reconciles.
        if let UnlockStatus::Unlocked { difficulty: next }
        | UnlockStatus::AlreadyUnlocked { difficulty: next }
        | UnlockStatus::Failed {
            difficulty: next, ..
        } = &unlock
        {
            progress.unlock(&category, *next);
        }

        tracing::info!(
            "User {} finished {} ({}): {}/{} correct, {:?}",
            user_id,
            category,
            difficulty,
            attempt.correct_count(),
            attempt.questions().len(),
            outcome
        );

        Ok(CompletionReport {
            difficulties: unlock_service::lock_states(&progress, &category),
            incident: match outcome {
                Outcome::Fail => attempt.incident(),
                Outcome::Pass => None,
            },
            category,
            difficulty,
            outcome,
            correct_count: attempt.correct_count(),
            total: attempt.questions().len(),
            points_earned: attempt.points_earned(),
            unlock,
            games_played,
            warnings,
        })
    }
}
