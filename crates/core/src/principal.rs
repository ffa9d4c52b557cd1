//! The authenticated identity passed into service operations.

use myvote_db::entities::user;

/// An authenticated user, as far as the services are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// ID of the authenticated user.
    pub user_id: String,
    /// Username at the time of authentication.
    pub username: String,
}

impl Principal {
    /// Create a principal.
    #[must_use]
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }
}

impl From<&user::Model> for Principal {
    fn from(user: &user::Model) -> Self {
        Self::new(user.id.clone(), user.username.clone())
    }
}
