use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

const UNMATCHED_ROUTE: &str = "unmatched";

/// Route template for the request (`/api/v1/categories/{category}/progress`),
/// so path parameters never become label values.
fn route_label(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

/// Records request count and latency per route template.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = route_label(&req);

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &route, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &route])
        .observe(start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/categories/{category}/progress", get(|| async { "ok" }))
            .layer(middleware::from_fn(metrics_middleware))
    }

    async fn hit(uri: &str) {
        app()
            .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn labels_use_the_route_template() {
        hit("/categories/Social%20Engineering/progress").await;
        hit("/categories/Phishing/progress").await;

        let count = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/categories/{category}/progress", "200"])
            .get();
        assert!(count >= 2);
    }

    #[tokio::test]
    async fn unknown_routes_share_one_label() {
        hit("/no/such/route").await;
        let count = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", UNMATCHED_ROUTE, "404"])
            .get();
        assert!(count >= 1);
    }
}
