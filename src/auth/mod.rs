//! Client-side session management for the multi-role RTA portal.
//!
//! Provides:
//! - Persisted session store (token + serialized user), in-memory or SQLite
//! - Optimistic restore at startup with delayed background validation
//! - Authenticated and public request wrappers; a 401 anywhere ends the session
//! - Two-step login (credential exchange, then profile fetch), registration, logout
//! - Role-scoped access decisions for portal areas
//!
//! ## Design Decisions
//! - Only a 401 revokes a session. Network errors and 5xx during validation
//!   leave the stored session in place.
//! - Nothing is persisted until both login steps succeed; a failed profile
//!   fetch restores the state published before the attempt.
//! - Published state is a `tokio::sync::watch` channel of immutable snapshots.

pub mod error;
pub mod guard;
pub mod manager;
pub mod navigation;
pub mod payload;
pub mod role;
pub mod state;
pub mod store;

pub use error::SessionError;
pub use guard::{check_access, Access};
pub use manager::{RequestOptions, SessionManager, SessionManagerBuilder, ValidationOutcome};
pub use navigation::{LogNavigator, NavTarget, Navigator};
pub use role::{
    ConfiguredEndpoints, EndpointOverride, EndpointResolver, Role, RoleEndpoints,
    StandardEndpoints,
};
pub use state::{Session, SessionSnapshot, TrustEvent, TrustState, User};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore, StoredSession};
