#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use audio_marketplace_client::{
    error::{AppError, AppResult},
    http::{HttpRequest, HttpResponse, HttpTransport, Method},
    models::{Money, ProductRef},
    services::session_service::SessionManager,
    storage::MemoryTokenStore,
    token::TokenClaims,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde_json::{Value, json};

/// Transport answering from per-route queues and recording every request.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<AppResult<HttpResponse>>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.push(method, path, Ok(HttpResponse::from_json(status, &body)));
    }

    pub fn fail(&self, method: Method, path: &str) {
        self.push(
            method,
            path,
            Err(AppError::Network("connection refused".into())),
        );
    }

    fn push(&self, method: Method, path: &str, outcome: AppResult<HttpResponse>) {
        self.routes
            .lock()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(outcome);
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, path: &str) -> Vec<HttpRequest> {
        self.sent().into_iter().filter(|r| r.path == path).collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        self.sent.lock().push(request.clone());
        // let concurrent callers interleave like a real network round trip
        tokio::task::yield_now().await;
        let next = self
            .routes
            .lock()
            .get_mut(&(request.method, request.path.clone()))
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| {
            Ok(HttpResponse::from_json(
                StatusCode::NOT_FOUND,
                &json!({ "detail": "Not found." }),
            ))
        })
    }
}

pub fn token_expiring_in(seconds: i64, user_id: i64) -> String {
    let claims = TokenClaims {
        exp: (Utc::now() + Duration::seconds(seconds)).timestamp(),
        iat: Some(Utc::now().timestamp()),
        user_id: Some(user_id),
        token_type: Some("access".into()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("encode token")
}

pub fn valid_token() -> String {
    token_expiring_in(3600, 1)
}

pub fn expired_token() -> String {
    token_expiring_in(-3600, 1)
}

pub fn user_json() -> Value {
    json!({ "id": 1, "username": "dj", "email": "dj@example.com", "role": "customer" })
}

pub fn auth_body(access: &str, refresh: &str) -> Value {
    json!({ "user": user_json(), "access": access, "refresh": refresh })
}

pub fn manager(transport: Arc<ScriptedTransport>) -> (SessionManager, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::new());
    (SessionManager::new(transport, store.clone()), store)
}

pub async fn logged_in(transport: &Arc<ScriptedTransport>, access: &str) -> (SessionManager, Arc<MemoryTokenStore>) {
    transport.respond(
        Method::Post,
        "/auth/login/",
        StatusCode::OK,
        auth_body(access, "refresh-1"),
    );
    let (session, store) = manager(transport.clone());
    session.login("dj", "secret1").await.expect("login");
    (session, store)
}

pub fn product(id: &str, price: &str) -> ProductRef {
    ProductRef {
        id: id.to_string(),
        title: format!("Loop {id}"),
        price: Money::parse(price).expect("price"),
        image_url: None,
        duration: Some(12.5),
        category: Some("Drums".into()),
    }
}
