//! Core business logic for myvote-rs.
//!
//! Services take the acting user as an explicit [`Principal`] (or
//! `Option<&Principal>` where anonymous access is allowed); nothing in this
//! crate reads an ambient "current user".

pub mod pagination;
pub mod principal;
pub mod services;

pub use pagination::{Page, Paginator, parse_page};
pub use principal::Principal;
pub use services::*;
