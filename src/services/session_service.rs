use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::StatusCode;
use tokio::sync::{Mutex, broadcast};

use crate::{
    dto::auth::{AuthResponse, LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest},
    error::{AppError, AppResult, ErrorPayload},
    events::{EventBus, SessionClearReason, StoreEvent},
    http::{HttpRequest, HttpResponse, HttpTransport, Method, RequestBody},
    models::UserProfile,
    storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore},
    token::{ClaimsDecoder, Clock, JwtClaimsDecoder, SystemClock, token_is_valid},
};

/// Retries allowed after the first attempt of an authorized call.
const MAX_AUTH_RETRIES: u32 = 1;

/// Snapshot of the credential state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<UserProfile>,
}

enum Attempt {
    Done(HttpResponse),
    Retry,
}

enum RefreshOutcome {
    Refreshed,
    NoRefreshToken,
}

/// Owns the access/refresh token pair and performs authorized calls with a
/// single silent refresh on 401.
pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    decoder: Arc<dyn ClaimsDecoder>,
    clock: Arc<dyn Clock>,
    state: RwLock<SessionState>,
    // Held for the duration of a refresh so concurrent 401s share one.
    refresh_lock: Mutex<()>,
    events: EventBus,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            transport,
            store,
            decoder: Arc::new(JwtClaimsDecoder),
            clock: Arc::new(SystemClock),
            state: RwLock::new(SessionState::default()),
            refresh_lock: Mutex::new(()),
            events: EventBus::new(),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ClaimsDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> Session {
        let state = self.state.read();
        Session {
            access_token: state.access_token.clone(),
            refresh_token: state.refresh_token.clone(),
            user: state.user.clone(),
            is_authenticated: self.token_valid(state.access_token.as_deref()),
        }
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.read().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().access_token.clone()
    }

    pub fn is_token_valid(&self) -> bool {
        self.token_valid(self.state.read().access_token.as_deref())
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_token_valid()
    }

    fn token_valid(&self, token: Option<&str>) -> bool {
        token_is_valid(self.decoder.as_ref(), token, self.clock.now())
    }

    /// Loads persisted tokens and, when the access token is still valid,
    /// re-fetches the profile.
    pub async fn restore(&self) -> AppResult<Session> {
        let access = self.store.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.store.get(REFRESH_TOKEN_KEY)?;
        {
            let mut state = self.state.write();
            state.access_token = access;
            state.refresh_token = refresh;
            state.user = None;
        }

        if self.is_token_valid() {
            if let Err(err) = self.fetch_profile().await {
                tracing::warn!(error = %err, "profile reload failed");
            }
        }
        Ok(self.session())
    }

    pub async fn login(&self, identifier: &str, password: &str) -> AppResult<Session> {
        let payload = LoginRequest {
            username: identifier.to_string(),
            password: password.to_string(),
        };
        let request = HttpRequest::post("/auth/login/").json(serde_json::to_value(&payload)?);
        let auth = self.authenticate(request).await?;
        tracing::info!(username = %auth.user.username, "logged in");
        Ok(self.establish(auth))
    }

    pub async fn register(&self, fields: RegisterRequest) -> AppResult<Session> {
        fields.validate().into_result()?;

        let request = HttpRequest::post("/auth/register/").json(serde_json::to_value(&fields)?);
        let auth = self.authenticate(request).await?;
        tracing::info!(username = %auth.user.username, "registered");
        Ok(self.establish(auth))
    }

    async fn authenticate(&self, request: HttpRequest) -> AppResult<AuthResponse> {
        let response = self.transport.send(request).await?;
        if response.is_success() {
            return response.json();
        }
        if response.status().is_client_error() {
            Err(AppError::Auth(response.error_payload()))
        } else {
            Err(AppError::from_response(&response))
        }
    }

    fn establish(&self, auth: AuthResponse) -> Session {
        let username = auth.user.username.clone();
        {
            let mut state = self.state.write();
            state.access_token = Some(auth.access.clone());
            state.refresh_token = auth.refresh.clone();
            state.user = Some(auth.user);
        }
        self.persist(ACCESS_TOKEN_KEY, Some(&auth.access));
        self.persist(REFRESH_TOKEN_KEY, auth.refresh.as_deref());
        self.events.emit(StoreEvent::LoggedIn { username });
        self.session()
    }

    /// Clears the session whatever the server says about it.
    pub async fn logout(&self) {
        let token = self.access_token();
        let request = HttpRequest::post("/auth/logout/")
            .json(serde_json::json!({}))
            .bearer(token);
        match self.transport.send(request).await {
            Ok(response) if !response.is_success() => {
                tracing::warn!(status = %response.status(), "server rejected logout")
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "logout request failed"),
        }
        self.clear(SessionClearReason::Logout);
        tracing::info!("logged out");
    }

    pub async fn fetch_profile(&self) -> AppResult<UserProfile> {
        if !self.is_token_valid() {
            return Err(AppError::Auth(ErrorPayload::message(
                "Authentication credentials were not provided.",
            )));
        }
        let user: UserProfile = self
            .send_authorized(HttpRequest::get("/auth/profile/"))
            .await?
            .into_result()?;
        self.state.write().user = Some(user.clone());
        self.events.emit(StoreEvent::ProfileLoaded {
            username: user.username.clone(),
        });
        Ok(user)
    }

    pub async fn authorized_request(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> AppResult<HttpResponse> {
        self.send_authorized(HttpRequest::new(method, path).body(body))
            .await
    }

    /// Sends `request` with the current access token. A 401 triggers at most
    /// one refresh and one resubmission; any other status is returned as is.
    pub async fn send_authorized(&self, request: HttpRequest) -> AppResult<HttpResponse> {
        let mut attempt = 0;
        loop {
            match self.attempt(&request, attempt).await? {
                Attempt::Done(response) => return Ok(response),
                Attempt::Retry => attempt += 1,
            }
        }
    }

    async fn attempt(&self, request: &HttpRequest, attempt: u32) -> AppResult<Attempt> {
        let token = self.access_token();
        let response = self
            .transport
            .send(request.clone().bearer(token.clone()))
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(Attempt::Done(response));
        }
        if attempt >= MAX_AUTH_RETRIES {
            tracing::warn!(path = %request.path, "still unauthorized after refresh");
            return Err(AppError::Auth(response.error_payload()));
        }

        match self.refresh_access_token(token.as_deref()).await? {
            RefreshOutcome::Refreshed => Ok(Attempt::Retry),
            RefreshOutcome::NoRefreshToken => Err(AppError::Auth(response.error_payload())),
        }
    }

    async fn refresh_access_token(&self, stale: Option<&str>) -> AppResult<RefreshOutcome> {
        let _guard = self.refresh_lock.lock().await;

        let refresh = {
            let state = self.state.read();
            if state.access_token.is_some() && state.access_token.as_deref() != stale {
                // refreshed by another caller while we waited
                return Ok(RefreshOutcome::Refreshed);
            }
            match state.refresh_token.clone() {
                Some(refresh) => refresh,
                None => return Ok(RefreshOutcome::NoRefreshToken),
            }
        };

        let request = HttpRequest::post("/auth/token/refresh/").json(serde_json::to_value(
            RefreshRequest { refresh: &refresh },
        )?);
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed");
                self.clear(SessionClearReason::RefreshFailed);
                return Err(err);
            }
        };

        let tokens = match response.into_result::<RefreshResponse>() {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::warn!(error = %err, "token refresh rejected");
                self.clear(SessionClearReason::RefreshFailed);
                return Err(AppError::SessionExpired);
            }
        };

        {
            let mut state = self.state.write();
            state.access_token = Some(tokens.access.clone());
            if let Some(refresh) = &tokens.refresh {
                state.refresh_token = Some(refresh.clone());
            }
        }
        self.persist(ACCESS_TOKEN_KEY, Some(&tokens.access));
        if let Some(refresh) = &tokens.refresh {
            self.persist(REFRESH_TOKEN_KEY, Some(refresh));
        }
        tracing::debug!("access token refreshed");
        self.events.emit(StoreEvent::TokenRefreshed);
        Ok(RefreshOutcome::Refreshed)
    }

    fn clear(&self, reason: SessionClearReason) {
        *self.state.write() = SessionState::default();
        self.persist(ACCESS_TOKEN_KEY, None);
        self.persist(REFRESH_TOKEN_KEY, None);
        self.events.emit(StoreEvent::SessionCleared { reason });
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        if let Err(err) = result {
            tracing::warn!(error = %err, key, "token store write failed");
        }
    }
}
