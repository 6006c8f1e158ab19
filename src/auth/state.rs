//! Session data model and the trust state machine.
//!
//! Startup runs `Cold -> {Unauthenticated | OptimisticallyTrusted}`;
//! background validation then moves an optimistic session to `Trusted`
//! or, on a definitive 401 only, back to `Unauthenticated`.

use super::role::Role;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── User ─────────────────────────────────────────────────────────

/// Authenticated identity: a role tag plus opaque profile fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Missing, null or empty tags deserialize as [`Role::Investor`].
    #[serde(default, deserialize_with = "role_or_default")]
    pub role: Role,
    /// Every other field, passed through from the server untouched.
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl User {
    /// Build a user from a server profile object.
    pub fn from_profile(profile: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(profile))
    }

    /// Parse a persisted user record.
    pub fn from_stored(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn role_or_default<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(Role::default()),
        Some(tag) => tag.parse().map_err(serde::de::Error::custom),
    }
}

// ── Session ──────────────────────────────────────────────────────

/// A complete session: both halves present.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: User,
}

// ── Trust state machine ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustState {
    /// Nothing read yet.
    Cold,
    Unauthenticated,
    /// Restored from the store, not yet confirmed by the server.
    OptimisticallyTrusted,
    /// Confirmed by the server or freshly logged in.
    Trusted,
}

/// Inputs that drive [`TrustState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustEvent {
    StoreEmpty,
    StoreCorrupt,
    SessionRestored,
    ValidationConfirmed,
    /// Network or server failure during validation. Not authoritative.
    ValidationInconclusive,
    /// A 401 from any authenticated call.
    Unauthorized,
    LoggedIn,
    LoggedOut,
}

impl TrustState {
    pub fn on(self, event: TrustEvent) -> Self {
        use TrustEvent as E;
        match (self, event) {
            (Self::Cold, E::StoreEmpty | E::StoreCorrupt) => Self::Unauthenticated,
            (Self::Cold, E::SessionRestored) => Self::OptimisticallyTrusted,
            (Self::OptimisticallyTrusted, E::ValidationConfirmed) => Self::Trusted,
            (_, E::Unauthorized | E::LoggedOut) => Self::Unauthenticated,
            (_, E::LoggedIn) => Self::Trusted,
            (state, _) => state,
        }
    }

    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::OptimisticallyTrusted | Self::Trusted)
    }
}

// ── Published snapshot ───────────────────────────────────────────

/// What subscribers see. Replaced wholesale on every publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub user: Option<User>,
    /// True until startup resolves, and while login/register run.
    pub loading: bool,
    pub trust: TrustState,
    /// Message of the last failed login or registration.
    pub last_error: Option<String>,
}

impl SessionSnapshot {
    /// State before the store has been read.
    pub fn cold() -> Self {
        Self {
            token: None,
            user: None,
            loading: true,
            trust: TrustState::Cold,
            last_error: None,
        }
    }

    pub fn empty(trust: TrustState) -> Self {
        Self {
            token: None,
            user: None,
            loading: false,
            trust,
            last_error: None,
        }
    }

    pub fn authenticated(session: Session, trust: TrustState) -> Self {
        Self {
            token: Some(session.token),
            user: Some(session.user),
            loading: false,
            trust,
            last_error: None,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }
}
