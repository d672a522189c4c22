#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use cyberquiz_api::{
    config::{Config, StorageBackend},
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    models::Question,
    services::{question_bank::QuestionBank, store::LocalUserStore, AppState},
};

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

fn test_config() -> Config {
    Config {
        storage_backend: StorageBackend::Local,
        mongo_uri: "mongodb://localhost:27017".to_string(),
        mongo_database: "cyberquiz_test".to_string(),
        local_store_path: None,
        question_bank_path: String::new(),
        jwt_secret: JWT_SECRET.to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
    }
}

fn question(difficulty: &str, text: &str, points: u32) -> Value {
    json!({
        "category": "Phishing",
        "difficulty": difficulty,
        "question_text": text,
        "question_type": "multiple-choice",
        "options": ["Phish", "Safe"],
        "correct_answer": "Phish",
        "points": points,
    })
}

/// Phishing: three easy (5 pts), three medium (10 pts), one hard ordering
/// question (15 pts). Malware: two easy questions carrying an incident.
pub fn test_bank() -> QuestionBank {
    let mut records = vec![
        question("easy", "Urgent password reset email", 5),
        question("easy", "Invoice from an unknown sender", 5),
        question("easy", "Prize notification", 5),
        question("medium", "Spoofed header", 10),
        question("medium", "Lookalike domain", 10),
        question("medium", "Credential form", 10),
        json!({
            "category": "Phishing",
            "difficulty": "hard",
            "question_text": "Order the response steps",
            "question_type": "ordering",
            "options": ["Report", "Do not click"],
            "correct_order": ["Do not click", "Report"],
            "points": 15,
        }),
    ];
    for text in ["Ransom note", "Encrypted files"] {
        records.push(json!({
            "category": "Malware",
            "difficulty": "easy",
            "question_text": text,
            "question_type": "true-false",
            "options": ["True", "False"],
            "correct_answer": "True",
            "points": 5,
            "incident_title": "WannaCry",
            "incident_details": "Ransomware worm that spread through unpatched SMB services.",
        }));
    }

    let questions: Vec<Question> = serde_json::from_value(Value::Array(records)).unwrap();
    QuestionBank::new(questions).unwrap()
}

pub async fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let state = Arc::new(AppState::with_parts(
        test_config(),
        Arc::new(LocalUserStore::in_memory()),
        test_bank(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

pub fn token_for(user_id: &str, username: Option<&str>) -> String {
    let now = chrono::Utc::now().timestamp();
    JwtService::new(JWT_SECRET)
        .generate_token(&JwtClaims {
            sub: user_id.to_string(),
            username: username.map(str::to_string),
            email: Some(format!("{}@example.com", user_id)),
            exp: (now + 3600) as usize,
            iat: now as usize,
        })
        .unwrap()
}

impl TestApp {
    /// Sends a request and returns the status with the JSON body (`Null` when empty).
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn answer(&self, token: &str, response: Value) -> Value {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/attempt/answer",
                Some(token),
                Some(json!({ "response": response })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "answer failed: {}", body);

        let (status, body_advance) = self
            .call("POST", "/api/v1/attempt/advance", Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK, "advance failed: {}", body_advance);
        body
    }
}
