//! Session manager: the one component allowed to change session identity.
//!
//! ## Responsibilities
//!
//! - **Startup**: read the store, publish the stored session immediately,
//!   then validate it in the background after a fixed delay
//! - **Authenticated calls**: attach the bearer token; a 401 tears the
//!   session down (store, published state, navigation) before the error
//!   reaches the caller
//! - **Public calls**: plain JSON requests, no identity
//! - **Login / register / logout**: the two-step credential exchange and
//!   its counterparts
//!
//! Only a 401 revokes trust. Network errors and 5xx during background
//! validation are logged and otherwise ignored.

use super::error::SessionError;
use super::navigation::{LogNavigator, NavTarget, Navigator};
use super::payload::{self, Detail, MIN_TOKEN_LEN};
use super::role::{EndpointResolver, Role, StandardEndpoints};
use super::state::{Session, SessionSnapshot, TrustEvent, TrustState, User};
use super::store::{MemorySessionStore, SessionStore};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Delay before the background validation of a restored session.
pub const DEFAULT_VALIDATION_DELAY: Duration = Duration::from_millis(1000);

// ── Request options ──────────────────────────────────────────────

/// Method, extra headers and optional JSON body for a wrapped request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Result of a background validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Server accepted the token; trust is now `Trusted`.
    Confirmed,
    /// Server answered 401; the session was torn down.
    Revoked,
    /// Non-authoritative failure; session left as it was.
    Inconclusive(String),
    /// No session to validate, or a different one was published while
    /// the check was running.
    Skipped,
}

// ── Builder ──────────────────────────────────────────────────────

pub struct SessionManagerBuilder {
    api_base: String,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    endpoints: Arc<dyn EndpointResolver>,
    validation_delay: Duration,
    min_token_len: usize,
    http: Option<reqwest::Client>,
}

impl SessionManagerBuilder {
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn endpoints(mut self, endpoints: Arc<dyn EndpointResolver>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn validation_delay(mut self, delay: Duration) -> Self {
        self.validation_delay = delay;
        self
    }

    pub fn min_token_len(mut self, len: usize) -> Self {
        self.min_token_len = len;
        self
    }

    /// Use a preconfigured HTTP client instead of a default one.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    pub fn build(self) -> anyhow::Result<SessionManager> {
        let http = match self.http {
            Some(client) => client,
            None => reqwest::Client::builder().build()?,
        };
        let (state, _) = watch::channel(SessionSnapshot::cold());

        Ok(SessionManager {
            http,
            api_base: self.api_base.trim_end_matches('/').to_string(),
            store: self.store,
            navigator: self.navigator,
            endpoints: self.endpoints,
            validation_delay: self.validation_delay,
            min_token_len: self.min_token_len,
            trust: Mutex::new(TrustState::Cold),
            state,
        })
    }
}

// ── Session manager ──────────────────────────────────────────────

pub struct SessionManager {
    http: reqwest::Client,
    api_base: String,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    endpoints: Arc<dyn EndpointResolver>,
    validation_delay: Duration,
    min_token_len: usize,
    trust: Mutex<TrustState>,
    /// Published session state; replaced wholesale on every change.
    state: watch::Sender<SessionSnapshot>,
}

impl SessionManager {
    /// Start building a manager against the given API origin.
    ///
    /// Defaults: in-memory store, logging navigator, standard endpoint
    /// table, one second validation delay.
    pub fn builder(api_base: impl Into<String>) -> SessionManagerBuilder {
        SessionManagerBuilder {
            api_base: api_base.into(),
            store: Arc::new(MemorySessionStore::new()),
            navigator: Arc::new(LogNavigator),
            endpoints: Arc::new(StandardEndpoints),
            validation_delay: DEFAULT_VALIDATION_DELAY,
            min_token_len: MIN_TOKEN_LEN,
            http: None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn trust(&self) -> TrustState {
        *self.trust.lock()
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn apply(&self, event: TrustEvent) -> TrustState {
        let mut trust = self.trust.lock();
        let prev = *trust;
        let next = prev.on(event);
        if next != prev {
            tracing::debug!(from = ?prev, to = ?next, ?event, "Trust state changed");
        }
        *trust = next;
        next
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.state.send_replace(snapshot);
    }

    // ── Startup ─────────────────────────────────────────────────

    /// Resolve the cold state from the store and publish the result.
    ///
    /// Performs no network I/O. Returns the restored session, if any.
    pub fn restore(&self) -> Option<Session> {
        let restored = match self.store.read() {
            Ok(Some(stored)) => match User::from_stored(&stored.user) {
                Ok(user) => Ok(Some(Session {
                    token: stored.token,
                    user,
                })),
                Err(e) => Err(SessionError::CorruptSession(e.to_string())),
            },
            Ok(None) => Ok(None),
            Err(e) => Err(SessionError::Store(e)),
        };

        match restored {
            Ok(Some(session)) => {
                let trust = self.apply(TrustEvent::SessionRestored);
                tracing::info!(
                    role = %session.user.role,
                    "Found stored session, trusting it until validated"
                );
                self.publish(SessionSnapshot::authenticated(session.clone(), trust));
                Some(session)
            }
            Ok(None) => {
                let trust = self.apply(TrustEvent::StoreEmpty);
                tracing::debug!("No stored session");
                self.publish(SessionSnapshot::empty(trust));
                None
            }
            Err(e) => {
                tracing::warn!("Discarding stored session: {e}");
                if let Err(clear_err) = self.store.clear() {
                    tracing::warn!("Failed to clear session store: {clear_err}");
                }
                let trust = self.apply(TrustEvent::StoreCorrupt);
                self.publish(SessionSnapshot::empty(trust));
                None
            }
        }
    }

    /// Run startup: [`restore`](Self::restore), then schedule background
    /// validation after the configured delay.
    ///
    /// Must be called from within a tokio runtime. Returns the handle of
    /// the validation task, or `None` when there was nothing to validate.
    pub fn initialize(self: &Arc<Self>) -> Option<JoinHandle<ValidationOutcome>> {
        self.restore()?;

        let this = Arc::clone(self);
        let delay = self.validation_delay;
        Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.validate().await
        }))
    }

    /// Check the published session against its role's profile endpoint.
    ///
    /// Returns [`ValidationOutcome::Skipped`] when there is no session, or
    /// when a different session was published while the check was running.
    pub async fn validate(&self) -> ValidationOutcome {
        let checked = self.snapshot();
        let Some(role) = checked.role() else {
            return ValidationOutcome::Skipped;
        };
        let profile = self.endpoints.resolve(role).profile;

        match self.fetch_with_auth(&profile, RequestOptions::get()).await {
            Ok(response) if response.status().is_success() => {
                self.confirm(checked.token.as_deref(), role)
            }
            Ok(response) => {
                self.inconclusive(format!("profile check returned {}", response.status()))
            }
            Err(SessionError::Unauthorized) => ValidationOutcome::Revoked,
            Err(SessionError::NoCredential) => ValidationOutcome::Skipped,
            Err(e) => self.inconclusive(e.to_string()),
        }
    }

    fn confirm(&self, token: Option<&str>, role: Role) -> ValidationOutcome {
        let trust = self.apply(TrustEvent::ValidationConfirmed);

        let mut same_session = false;
        self.state.send_if_modified(|s| {
            same_session = s.token.as_deref() == token;
            let changed = same_session && s.trust != trust;
            if changed {
                s.trust = trust;
            }
            changed
        });

        if !same_session {
            tracing::debug!(%role, "Session changed during validation, ignoring result");
            return ValidationOutcome::Skipped;
        }
        tracing::info!(%role, "Stored session confirmed by server");
        ValidationOutcome::Confirmed
    }

    fn inconclusive(&self, reason: String) -> ValidationOutcome {
        let err = SessionError::TransientValidationFailure(reason);
        tracing::warn!("{err}; keeping session");
        self.apply(TrustEvent::ValidationInconclusive);
        ValidationOutcome::Inconclusive(err.to_string())
    }

    // ── Request wrappers ────────────────────────────────────────

    /// Send an authenticated request to `<api_base><path>`.
    ///
    /// Fails with [`SessionError::NoCredential`] before any I/O when the
    /// store holds no token. Every status except 401 is returned as-is.
    pub async fn fetch_with_auth(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, SessionError> {
        let Some(stored) = self.store.read()? else {
            tracing::debug!(path, "Authenticated request without a token");
            return Err(SessionError::NoCredential);
        };
        self.send_authenticated(&stored.token, path, options).await
    }

    async fn send_authenticated(
        &self,
        token: &str,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, SessionError> {
        let RequestOptions {
            method,
            mut headers,
            body,
        } = options;
        headers.remove(AUTHORIZATION);

        let mut request = self
            .http
            .request(method, self.url(path))
            .headers(headers)
            .bearer_auth(token);
        if let Some(ref body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "Received 401 Unauthorized, clearing session");
            self.teardown(TrustEvent::Unauthorized);
            return Err(SessionError::Unauthorized);
        }
        Ok(response)
    }

    /// Send an unauthenticated JSON request to `<api_base><path>`.
    pub async fn fetch_public(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response, SessionError> {
        let RequestOptions {
            method,
            headers,
            body,
        } = options;

        let mut request = self
            .http
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json")
            .headers(headers);
        if let Some(ref body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    fn teardown(&self, event: TrustEvent) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear session store: {e}");
        }
        let trust = self.apply(event);
        self.publish(SessionSnapshot::empty(trust));
        self.navigator.navigate(NavTarget::Landing);
    }

    // ── Credential exchange ─────────────────────────────────────

    /// Two-step login: exchange credentials for a token, then fetch the
    /// profile with it. Persists and publishes only once both succeed.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        role: Role,
    ) -> Result<User, SessionError> {
        self.begin_operation();
        let result = self.run_login(identifier, password, role).await;
        if let Err(ref e) = result {
            self.fail_operation(e);
        }
        result
    }

    async fn run_login(
        &self,
        identifier: &str,
        password: &str,
        role: Role,
    ) -> Result<User, SessionError> {
        let endpoints = self.endpoints.resolve(role);
        tracing::info!(%role, "Logging in");

        let mut credentials = Map::new();
        credentials.insert(
            endpoints.identifier_field.clone(),
            Value::String(identifier.to_string()),
        );
        credentials.insert("password".into(), Value::String(password.to_string()));

        let response = self
            .fetch_public(&endpoints.exchange, RequestOptions::post(Value::Object(credentials)))
            .await?;
        let status = response.status();
        let body = read_json(response).await;
        if !status.is_success() {
            tracing::warn!(%role, %status, "Credential exchange rejected");
            return Err(SessionError::ExchangeFailed(payload::detail_message(
                &body,
                "Login failed",
            )));
        }

        let token = payload::extract_token(&body, self.min_token_len)
            .ok_or_else(|| SessionError::ExchangeFailed("Invalid token received".into()))?;

        // Token is visible before the profile arrives; user stays empty
        // and nothing is persisted until both halves are known. Whatever
        // was published up to now (including a concurrent logout) is what
        // a failed profile fetch restores.
        let previous = self.state.send_replace(SessionSnapshot {
            token: Some(token.clone()),
            user: None,
            loading: true,
            trust: self.trust(),
            last_error: None,
        });

        let user = match self.fetch_identity(&token, &endpoints.profile).await {
            Ok(user) => user,
            Err(e) => {
                if !e.is_unauthorized() {
                    self.roll_back(previous, &token);
                }
                return Err(e);
            }
        };

        if let Err(e) = self.persist(&token, &user) {
            self.roll_back(previous, &token);
            return Err(e);
        }

        let trust = self.apply(TrustEvent::LoggedIn);
        self.publish(SessionSnapshot::authenticated(
            Session {
                token,
                user: user.clone(),
            },
            trust,
        ));
        tracing::info!(%role, user_role = %user.role, "Login complete");
        self.navigator.navigate(NavTarget::Home(role));
        Ok(user)
    }

    async fn fetch_identity(&self, token: &str, profile_path: &str) -> Result<User, SessionError> {
        let response = self
            .send_authenticated(token, profile_path, RequestOptions::get())
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Profile fetch failed");
            return Err(SessionError::ProfileFetchFailed(text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SessionError::ProfileFetchFailed(format!("invalid profile body: {e}")))?;
        let profile = payload::extract_profile(&body).ok_or_else(|| {
            SessionError::ProfileFetchFailed("profile response is not an object".into())
        })?;

        User::from_profile(profile).map_err(|e| SessionError::ProfileFetchFailed(e.to_string()))
    }

    fn persist(&self, token: &str, user: &User) -> Result<(), SessionError> {
        let serialized = user.to_stored().map_err(anyhow::Error::from)?;
        self.store.write(token, &serialized)?;
        Ok(())
    }

    /// Undo the partial-login publish, unless something else (logout, a
    /// 401 teardown) has replaced it in the meantime.
    fn roll_back(&self, previous: SessionSnapshot, partial_token: &str) {
        let rolled_back = self.state.send_if_modified(|current| {
            let still_partial =
                current.user.is_none() && current.token.as_deref() == Some(partial_token);
            if still_partial {
                *current = previous;
            }
            still_partial
        });
        if rolled_back {
            tracing::debug!("Rolled back partial login");
        } else {
            tracing::debug!("Session changed during login, keeping newer state");
        }
    }

    /// Submit a registration payload to the role's register endpoint.
    ///
    /// Returns the server's JSON body (`null` when empty).
    pub async fn register(&self, payload: &Value, role: Role) -> Result<Value, SessionError> {
        self.begin_operation();
        let result = self.run_register(payload, role).await;
        match result {
            Ok(_) => self.state.send_modify(|s| s.loading = false),
            Err(ref e) => self.fail_operation(e),
        }
        result
    }

    async fn run_register(&self, payload: &Value, role: Role) -> Result<Value, SessionError> {
        let endpoints = self.endpoints.resolve(role);
        let response = self
            .fetch_public(&endpoints.register, RequestOptions::post(payload.clone()))
            .await?;
        let status = response.status();
        let body = read_json(response).await;

        if !status.is_success() {
            tracing::warn!(%role, %status, "Registration rejected");
            return Err(match payload::parse_detail(&body) {
                Some(Detail::FieldErrors(message)) => SessionError::ValidationFailed(message),
                Some(Detail::Message(message)) => SessionError::RegistrationFailed(message),
                None => SessionError::RegistrationFailed("Registration failed".into()),
            });
        }

        tracing::info!(%role, "Registration accepted");
        Ok(body)
    }

    /// Clear the store, publish empty state and go to the landing view.
    ///
    /// Safe to call when already logged out. A store failure is returned
    /// after the in-memory state has been cleared anyway.
    pub fn logout(&self) -> Result<(), SessionError> {
        tracing::info!("Logging out");
        let cleared = self.store.clear();
        let trust = self.apply(TrustEvent::LoggedOut);
        self.publish(SessionSnapshot::empty(trust));
        self.navigator.navigate(NavTarget::Landing);
        cleared.map_err(SessionError::from)
    }

    fn begin_operation(&self) {
        self.state.send_modify(|s| {
            s.loading = true;
            s.last_error = None;
        });
    }

    fn fail_operation(&self, err: &SessionError) {
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.loading = false;
            s.last_error = Some(message);
        });
    }
}

/// Body as JSON, or `null` when it is empty or not JSON.
async fn read_json(response: Response) -> Value {
    response.json::<Value>().await.unwrap_or(Value::Null)
}

// ── Tests ────────────────────────────────────────────────────────
