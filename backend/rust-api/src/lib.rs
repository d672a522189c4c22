use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{PersistenceError, QuizError};
pub use services::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Game endpoints (require JWT)
        .nest(
            "/api/v1",
            api_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(cors)
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(handlers::players::get_profile))
        .route("/me/welcome", post(handlers::players::mark_welcome_seen))
        .route("/leaderboard", get(handlers::players::leaderboard))
        .route("/categories", get(handlers::game::list_categories))
        .route(
            "/categories/{category}/explanation",
            post(handlers::game::mark_explanation_seen),
        )
        .route(
            "/categories/{category}/progress",
            get(handlers::game::category_progress),
        )
        .route(
            "/attempt",
            post(handlers::game::start_attempt)
                .get(handlers::game::current_attempt)
                .delete(handlers::game::abandon_attempt),
        )
        .route("/attempt/answer", post(handlers::game::submit_answer))
        .route("/attempt/advance", post(handlers::game::advance_attempt))
        .route("/attempt/complete", post(handlers::game::complete_attempt))
}
