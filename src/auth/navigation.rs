//! Navigation callback seam.
//!
//! The session manager decides *when* the UI should move (after login,
//! logout and revocation) but never how. Callers hand in a [`Navigator`];
//! any `Fn(NavTarget)` closure qualifies.

use super::role::Role;

/// Where the session manager wants the UI to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavTarget {
    /// Public landing view. Used after logout and revocation.
    Landing,
    /// Login view of a role's area.
    Login(Role),
    /// Home view of a role after a successful login.
    Home(Role),
}

impl NavTarget {
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Login(role) => role.login_path(),
            Self::Home(role) => role.home_path(),
        }
    }
}

impl std::fmt::Display for NavTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, target: NavTarget);
}

impl<F> Navigator for F
where
    F: Fn(NavTarget) + Send + Sync,
{
    fn navigate(&self, target: NavTarget) {
        self(target)
    }
}

/// Navigator for headless use: records the move in the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, target: NavTarget) {
        tracing::info!(path = target.path(), "Navigation requested");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn paths_follow_role_tables() {
        assert_eq!(NavTarget::Landing.path(), "/");
        assert_eq!(NavTarget::Home(Role::Admin).path(), "/admin/admindashboard");
        assert_eq!(NavTarget::Login(Role::Amc).path(), "/amc/login");
        assert_eq!(NavTarget::Home(Role::Investor).to_string(), "/investor");
    }

    #[test]
    fn closures_are_navigators() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let nav = move |t: NavTarget| sink.lock().push(t);

        nav.navigate(NavTarget::Landing);
        nav.navigate(NavTarget::Home(Role::Distributor));

        assert_eq!(
            *seen.lock(),
            vec![NavTarget::Landing, NavTarget::Home(Role::Distributor)]
        );
    }
}
