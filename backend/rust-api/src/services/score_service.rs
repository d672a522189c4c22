use std::sync::Arc;

use crate::error::QuizError;
use crate::metrics::POINTS_AWARDED_TOTAL;

use super::store::UserStore;

/// Adds points to a player's running total. The increment itself is atomic
/// in the store, so concurrent awards never lose an update.
pub struct ScoreService {
    store: Arc<dyn UserStore>,
}

impl ScoreService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Returns the total after the increment.
    pub async fn award(&self, user_id: &str, points: u32) -> Result<u64, QuizError> {
        if points == 0 {
            let user = self.store.get_user(user_id).await?;
            return Ok(user.score);
        }

        let total = self.store.increment_score(user_id, points).await?;
        POINTS_AWARDED_TOTAL.inc_by(u64::from(points));
        tracing::debug!("Awarded {} point(s) to {}, total {}", points, user_id, total);
        Ok(total)
    }
}
