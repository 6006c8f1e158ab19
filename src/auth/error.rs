//! Error taxonomy for the session manager.

/// Errors surfaced by [`SessionManager`](super::SessionManager) operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An authenticated call was attempted with no token in the store.
    /// Raised before any network I/O.
    #[error("no authentication token available")]
    NoCredential,

    /// The server answered 401 on an authenticated call. The session has
    /// already been torn down when this is returned.
    #[error("unauthorized")]
    Unauthorized,

    /// Credential exchange returned non-2xx or an unusable token.
    #[error("{0}")]
    ExchangeFailed(String),

    /// Profile retrieval during login returned non-2xx or an unusable body.
    #[error("failed to fetch profile: {0}")]
    ProfileFetchFailed(String),

    /// Registration rejected with structured field errors, joined into one
    /// message (`loc.path: msg, ...`).
    #[error("{0}")]
    ValidationFailed(String),

    /// Registration rejected with a single server message.
    #[error("{0}")]
    RegistrationFailed(String),

    /// Stored user data could not be parsed at startup.
    #[error("stored session is corrupt: {0}")]
    CorruptSession(String),

    /// Background validation failed for a non-authoritative reason.
    /// Never returned from public operations.
    #[error("session validation inconclusive: {0}")]
    TransientValidationFailure(String),

    /// The request could not be sent or its body could not be read.
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The persisted session store failed.
    #[error("session store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl SessionError {
    /// Whether this error revoked the session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
