//! Repositories.
//!
//! Thin async wrappers over sea-orm queries. Every database failure is mapped
//! to [`myvote_common::AppError::Database`] unless a repository documents a
//! more specific mapping.

mod following;
mod poll;
mod poll_option;
mod user;
mod vote;

pub use following::FollowingRepository;
pub use poll::{PollRepository, RankedPollRow};
pub use poll_option::PollOptionRepository;
pub use user::UserRepository;
pub use vote::VoteRepository;

use sea_orm::{DbErr, SqlErr};

/// Whether a database error is a unique-constraint violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Escape `%`, `_` and `\` so user input matches literally inside a LIKE pattern.
#[must_use]
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }

    #[test]
    fn test_non_sql_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&DbErr::RecordNotFound("x".to_string())));
    }
}
