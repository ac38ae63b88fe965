use crate::portal::{
    metrics::Counter,
    types::{portal_now, AuthRequest, AuthResult, Outcome, ProfileField},
    AuthenticationClient, ErrorKind,
};
use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, FixedOffset};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, sync::Arc};
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct AuthenticateRequest {
    /// SRN, PRN, email or phone number.
    #[schema(example = "PES1201800001")]
    username: String,
    #[schema(example = "mySecurePassword123")]
    password: String,
    /// Also return the student's profile.
    #[serde(default)]
    profile: bool,
    /// Profile fields to return; every field when omitted.
    #[schema(example = json!(["name", "email", "campus"]))]
    fields: Option<Vec<String>>,
}

impl fmt::Debug for AuthenticateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticateRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .field("profile", &self.profile)
            .field("fields", &self.fields)
            .finish()
    }
}

#[derive(ToSchema, Serialize, Debug)]
pub struct ValidationFailure {
    status: bool,
    message: String,
    #[schema(value_type = String)]
    timestamp: DateTime<FixedOffset>,
}

impl ValidationFailure {
    fn new(reason: &str) -> Self {
        Self {
            status: false,
            message: format!("Could not validate request data - {reason}"),
            timestamp: portal_now(),
        }
    }
}

/// Check a request body and turn it into an engine request.
///
/// Username and password are trimmed and must not end up empty. `fields`, when
/// present, must be a non-empty list of known profile fields.
///
/// # Errors
/// Returns every problem found, joined by `; `.
pub fn validate(request: AuthenticateRequest) -> Result<AuthRequest, String> {
    let mut problems = Vec::new();

    let username = request.username.trim();
    if username.is_empty() {
        problems.push("username: Username cannot be empty.".to_string());
    }

    let password = request.password.trim();
    if password.is_empty() {
        problems.push("password: Password cannot be empty.".to_string());
    }

    let fields = match request.fields {
        None => None,
        Some(names) if names.is_empty() => {
            problems.push("fields: Fields must be a non-empty list when given.".to_string());
            None
        }
        Some(names) => {
            let mut fields = BTreeSet::new();
            for name in names {
                match name.parse::<ProfileField>() {
                    Ok(field) => {
                        fields.insert(field);
                    }
                    Err(e) => problems.push(format!("fields: {e}")),
                }
            }
            Some(fields)
        }
    };

    if !problems.is_empty() {
        return Err(problems.join("; "));
    }

    Ok(
        AuthRequest::new(username, SecretString::from(password.to_string()))
            .with_profile(request.profile)
            .with_fields(fields),
    )
}

/// HTTP status for a terminal outcome.
#[must_use]
pub const fn status_for(outcome: Outcome) -> StatusCode {
    match outcome {
        Outcome::Success | Outcome::ProfileFetchFailed | Outcome::ProfileParseFailed => {
            StatusCode::OK
        }
        Outcome::CredentialsRejected => StatusCode::UNAUTHORIZED,
        Outcome::Failed(ErrorKind::Unhandled) => StatusCode::INTERNAL_SERVER_ERROR,
        Outcome::Failed(_) => StatusCode::BAD_GATEWAY,
    }
}

#[utoipa::path(
    post,
    path= "/authenticate",
    request_body = AuthenticateRequest,
    responses (
        (status = 200, description = "Login successful", body = AuthResult, content_type = "application/json"),
        (status = 400, description = "Invalid request body", body = ValidationFailure),
        (status = 401, description = "Invalid credentials", body = AuthResult),
        (status = 500, description = "Unexpected error", body = AuthResult),
        (status = 502, description = "PESU Academy could not be reached or understood", body = AuthResult),
    ),
    tag= "authentication"
)]
pub async fn authenticate(
    client: Extension<Arc<AuthenticationClient>>,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Response {
    let request = match payload
        .map_err(|rejection| rejection.body_text())
        .and_then(|Json(body)| validate(body))
    {
        Ok(request) => request,
        Err(reason) => {
            client.metrics().incr(Counter::ValidationError);
            error!("Request data could not be validated: {}", reason);

            return (
                StatusCode::BAD_REQUEST,
                Json(ValidationFailure::new(&reason)),
            )
                .into_response();
        }
    };

    info!(
        username = request.username(),
        profile = request.want_profile(),
        "Authenticating user with PESU Academy"
    );

    let result = client.authenticate(request).await;

    (status_for(result.outcome), Json(result)).into_response()
}
