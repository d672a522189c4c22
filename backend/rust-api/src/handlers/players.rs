use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::QuizError, middlewares::auth::JwtClaims, services::AppState};

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, QuizError> {
    let profile = state.game.profile(&claims.sub).await?;
    Ok(Json(profile))
}

pub async fn mark_welcome_seen(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, QuizError> {
    state.game.mark_welcome_seen(&claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, QuizError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
        .clamp(1, MAX_LEADERBOARD_LIMIT);

    let page = query.page.unwrap_or(1).max(1);

    let board = state.game.leaderboard(&claims.sub, page, limit).await?;
    Ok(Json(board))
}
