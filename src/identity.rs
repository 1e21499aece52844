//! Identity collaborator.
//!
//! The reconciliation core never implements login, logout or token refresh;
//! it only asks "who is signed in right now?" at the start of every procedure
//! to decide between online and local-only behaviour.

use mockall::automock;

use crate::ids::TypedId;

/// User Id
pub type UserId = TypedId<CurrentUser>;

/// The signed-in user as seen by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: UserId,
}

/// Exposes the current user, if any.
#[automock]
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user, or `None` for a guest session.
    fn current_user(&self) -> Option<CurrentUser>;
}

/// An identity provider pinned to one signed-in user.
#[derive(Debug, Clone, Copy)]
pub struct FixedIdentity {
    user: CurrentUser,
}

impl FixedIdentity {
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user: CurrentUser { user_id },
        }
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_user(&self) -> Option<CurrentUser> {
        Some(self.user)
    }
}

/// A guest session: no user, every server-backed path soft-falls-back.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl IdentityProvider for Anonymous {
    fn current_user(&self) -> Option<CurrentUser> {
        None
    }
}
