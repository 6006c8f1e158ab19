//! rta-session: client-side session manager for the multi-role RTA portal.
//!
//! See [`auth::SessionManager`] for the entry point.

pub mod auth;
pub mod config;

pub use auth::{
    check_access, Access, NavTarget, Role, SessionError, SessionManager, SessionSnapshot,
    TrustState, User, ValidationOutcome,
};
pub use config::Config;
