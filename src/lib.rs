//! # pesuauth
//!
//! Authenticates students against PESU Academy and, on request, returns their
//! profile details.
//!
//! ## Engine (`portal`)
//!
//! - **Tokens:** the login form requires an anti-forgery token bound to a
//!   pre-login session. One token is cached and shared by all requests; a cache
//!   miss triggers a single upstream fetch no matter how many callers wait on it,
//!   and a background task refreshes it periodically.
//! - **Login:** each attempt posts the credentials in its own cookie session and
//!   classifies the reply as success, bad credentials or a rejected token. A
//!   rejected token is dropped and the login retried exactly once.
//! - **Profile:** scraped from the profile page after a successful login. A
//!   profile failure does not fail the login.
//! - **Metrics:** every request ends in exactly one counted outcome.
//!
//! ## Service (`pesuauth`)
//!
//! An axum server exposing `/authenticate`, `/metrics`, `/health`, `/readme`
//! and `/openapi.json`.

pub mod cli;
pub mod pesuauth;
pub mod portal;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
