use crate::portal::{
    config::PortalConfig,
    csrf::CsrfTokenManager,
    error::{AuthError, ErrorKind},
    http::{classify_login, LoginResponse, PortalClient, PortalSession},
    metrics::MetricsCollector,
    profile,
    types::{AuthRequest, AuthResult, Outcome, ProfileData, ProfileField},
};
use futures::FutureExt;
use std::{any::Any, collections::BTreeSet, future::Future, panic::AssertUnwindSafe, sync::Arc};
use tracing::{debug, error, info, instrument, warn};

/// Login submissions per request: the first attempt plus one retry after a token rejection.
const MAX_LOGIN_ATTEMPTS: u8 = 2;

enum Login {
    Accepted(PortalSession),
    Rejected,
}

/// Drives one authenticate call to a terminal [`AuthResult`].
#[derive(Debug, Clone)]
pub struct AuthenticationClient {
    portal: PortalClient,
    tokens: Arc<CsrfTokenManager>,
    metrics: Arc<MetricsCollector>,
}

impl AuthenticationClient {
    #[must_use]
    pub fn new(config: PortalConfig, metrics: Arc<MetricsCollector>) -> Self {
        let portal = PortalClient::new(config);
        let tokens = Arc::new(CsrfTokenManager::new(portal.clone()));
        Self {
            portal,
            tokens,
            metrics,
        }
    }

    #[must_use]
    pub const fn tokens(&self) -> &Arc<CsrfTokenManager> {
        &self.tokens
    }

    #[must_use]
    pub const fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    #[must_use]
    pub const fn portal(&self) -> &PortalClient {
        &self.portal
    }

    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        self.portal.config()
    }

    /// Authenticate against the portal.
    ///
    /// Never fails and never panics outward: every outcome, including a panic
    /// inside the flow, is returned as an [`AuthResult`] and counted once.
    #[instrument(
        skip(self, request),
        fields(username = %request.username(), profile = request.want_profile())
    )]
    pub async fn authenticate(&self, request: AuthRequest) -> AuthResult {
        self.settle(self.run(&request)).await
    }

    /// Drive `flow` to a result, turning a panic into `unhandled_exception`,
    /// and count the outcome.
    async fn settle<F>(&self, flow: F) -> AuthResult
    where
        F: Future<Output = AuthResult>,
    {
        let result = match AssertUnwindSafe(flow).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic_reason(panic.as_ref());
                error!("Authentication panicked: {}", reason);
                AuthResult::failure(
                    ErrorKind::Unhandled,
                    format!("An unexpected error occurred: {reason}"),
                )
            }
        };

        self.metrics.incr(result.outcome.counter());
        result
    }

    async fn run(&self, request: &AuthRequest) -> AuthResult {
        let session = match self.login(request).await {
            Ok(Login::Accepted(session)) => session,
            Ok(Login::Rejected) => {
                info!("Invalid credentials");
                return AuthResult::credentials_rejected();
            }
            Err(e) => {
                error!("Authentication failed: {}", e);
                return AuthResult::failure(e.kind(), failure_message(&e));
            }
        };

        info!("Login successful");

        if !request.want_profile() {
            return AuthResult::success(None);
        }

        match Self::profile(&session, request.fields()).await {
            Ok(profile) => AuthResult::success(Some(profile)),
            Err(e) => {
                warn!("Profile unavailable after a successful login: {}", e);
                let outcome = match e {
                    AuthError::ProfileParse(_) => Outcome::ProfileParseFailed,
                    _ => Outcome::ProfileFetchFailed,
                };
                AuthResult::success_without_profile(outcome)
            }
        }
    }

    async fn login(&self, request: &AuthRequest) -> Result<Login, AuthError> {
        for attempt in 1..=MAX_LOGIN_ATTEMPTS {
            let token = self.tokens.get().await?;

            let session = self
                .portal
                .session(token.cookies())
                .map_err(|e| AuthError::PesuAcademy(e.to_string()))?;

            let response = session
                .submit_login(request.username(), request.password(), token.value())
                .await
                .map_err(|e| AuthError::PesuAcademy(e.to_string()))?;

            match classify_login(&response, self.portal.config()) {
                LoginResponse::Success => return Ok(Login::Accepted(session)),
                LoginResponse::CredentialsRejected => return Ok(Login::Rejected),
                LoginResponse::TokenRejected => {
                    warn!(attempt, "PESU Academy rejected the CSRF token");
                    self.tokens.invalidate_token(&token).await;
                }
                LoginResponse::Unrecognized(reason) => {
                    return Err(AuthError::PesuAcademy(reason));
                }
            }
        }

        Err(AuthError::PesuAcademy(format!(
            "CSRF token rejected {MAX_LOGIN_ATTEMPTS} times"
        )))
    }

    async fn profile(
        session: &PortalSession,
        fields: Option<&BTreeSet<ProfileField>>,
    ) -> Result<ProfileData, AuthError> {
        let response = session
            .fetch_profile()
            .await
            .map_err(|e| AuthError::ProfileFetch(e.to_string()))?;

        if !response.status.is_success() {
            return Err(AuthError::ProfileFetch(format!(
                "unexpected status {}",
                response.status
            )));
        }

        let profile = profile::parse(&response.body, fields)?;
        debug!(fields = fields.map_or(0, BTreeSet::len), "profile parsed");
        Ok(profile)
    }
}

fn failure_message(error: &AuthError) -> String {
    match error.kind() {
        ErrorKind::CsrfToken => format!("Unable to fetch CSRF token: {error}"),
        ErrorKind::PesuAcademy => format!("Unable to reach PESU Academy: {error}"),
        _ => error.to_string(),
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|reason| (*reason).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
