//! Role-scoped access decisions for portal areas.

use super::navigation::NavTarget;
use super::role::Role;
use super::state::SessionSnapshot;

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Startup or an operation is still running; decide later.
    Pending,
    Allow,
    Redirect(NavTarget),
}

/// Decide whether the published session may enter `required`'s area.
pub fn check_access(snapshot: &SessionSnapshot, required: Role) -> Access {
    if snapshot.loading {
        return Access::Pending;
    }

    let Some(user) = snapshot.user.as_ref() else {
        return Access::Redirect(NavTarget::Login(required));
    };

    match (user.role, required) {
        (have, want) if have == want => Access::Allow,
        // Staff landing in the investor area get sent to their own home.
        (have, Role::Investor) => Access::Redirect(NavTarget::Home(have)),
        _ => Access::Redirect(NavTarget::Login(required)),
    }
}
