use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

/// The anti-forgery token could not be obtained from the portal.
#[derive(Debug, Error)]
pub enum CsrfTokenError {
    #[error("failed to fetch the login page: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("login page returned unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("CSRF token not found in the login page")]
    Missing,
    #[error("CSRF token on the login page is empty")]
    Empty,
    /// A foreground fetch failure, handed to the caller that ran it and to
    /// every caller queued behind it.
    #[error(transparent)]
    Shared(Arc<CsrfTokenError>),
}

impl CsrfTokenError {
    /// The failure behind any layers of sharing.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Shared(inner) => inner.root(),
            other => other,
        }
    }
}

/// The retrieved page is not a parseable profile page.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileParseError {
    #[error("profile details container not found; the page layout might have changed")]
    MissingContainer,
    #[error("no profile data could be extracted")]
    Empty,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    CsrfToken(#[from] CsrfTokenError),
    #[error("PESU Academy request failed: {0}")]
    PesuAcademy(String),
    #[error("failed to fetch the profile page: {0}")]
    ProfileFetch(String),
    #[error(transparent)]
    ProfileParse(#[from] ProfileParseError),
    #[error("unhandled error: {0}")]
    Unhandled(String),
}

impl AuthError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::CsrfToken(_) => ErrorKind::CsrfToken,
            Self::PesuAcademy(_) => ErrorKind::PesuAcademy,
            Self::ProfileFetch(_) => ErrorKind::ProfileFetch,
            Self::ProfileParse(_) => ErrorKind::ProfileParse,
            Self::Unhandled(_) => ErrorKind::Unhandled,
        }
    }
}

/// Tag reported in the `error` field of a failed result.
#[derive(ToSchema, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    #[serde(rename = "csrf_token_error")]
    CsrfToken,
    #[serde(rename = "pesu_academy_error")]
    PesuAcademy,
    #[serde(rename = "profile_fetch_error")]
    ProfileFetch,
    #[serde(rename = "profile_parse_error")]
    ProfileParse,
    #[serde(rename = "unhandled_exception")]
    Unhandled,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CsrfToken => "csrf_token_error",
            Self::PesuAcademy => "pesu_academy_error",
            Self::ProfileFetch => "profile_fetch_error",
            Self::ProfileParse => "profile_parse_error",
            Self::Unhandled => "unhandled_exception",
        }
    }
}
