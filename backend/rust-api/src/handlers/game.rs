use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::QuizError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::{StartAttemptRequest, SubmitAnswerRequest},
    services::AppState,
};

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, QuizError> {
    let categories = state.game.categories(&claims.sub).await?;
    Ok(Json(categories))
}

pub async fn mark_explanation_seen(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    state
        .game
        .mark_explanation_seen(&claims.sub, &category)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn category_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, QuizError> {
    let progress = state.game.category_progress(&claims.sub, &category).await?;
    Ok(Json(progress))
}

pub async fn start_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<StartAttemptRequest>,
) -> Result<impl IntoResponse, QuizError> {
    tracing::info!(
        "Starting attempt for user_id={}, category={}, difficulty={}",
        claims.sub,
        req.category,
        req.difficulty
    );

    let view = state
        .game
        .start(&claims.sub, &req.category, req.difficulty)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn current_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, QuizError> {
    let view = state.game.current(&claims.sub).await?;
    Ok(Json(view))
}

pub async fn abandon_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, QuizError> {
    state.game.abandon(&claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, QuizError> {
    let report = state.game.submit(&claims.sub, &req.response).await?;
    Ok(Json(report))
}

pub async fn advance_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, QuizError> {
    let view = state.game.advance(&claims.sub).await?;
    Ok(Json(view))
}

pub async fn complete_attempt(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, QuizError> {
    let report = state.game.complete(&claims.sub).await?;
    Ok(Json(report))
}
