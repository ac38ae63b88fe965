use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.pesuacademy.com/Academy/";
pub const DEFAULT_AUTH_URL: &str = "https://www.pesuacademy.com/Academy/j_spring_security_check";
pub const DEFAULT_PROFILE_URL: &str = "https://www.pesuacademy.com/Academy/s/studentProfilePESUAdmin";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_CSRF_REFRESH_INTERVAL_SECONDS: u64 = 2700;

/// Markers used to tell the portal's HTML responses apart.
///
/// The portal has no structured API and these are observed from the live
/// site, so they are kept together here instead of at their use sites.
#[derive(Clone, Debug)]
pub struct PortalMarkers {
    /// Element holding the anti-forgery token in its `content` attribute.
    pub csrf_meta_selector: String,
    /// Element present only when the login form is shown again.
    pub login_form_selector: String,
    /// Body fragments shown when the submitted token was stale or invalid.
    pub token_rejected_patterns: Vec<String>,
    /// Status returned when the submitted token was stale or invalid.
    pub token_rejected_status: u16,
}

impl Default for PortalMarkers {
    fn default() -> Self {
        Self {
            csrf_meta_selector: "meta[name='csrf-token']".to_string(),
            login_form_selector: "div.login-form".to_string(),
            token_rejected_patterns: vec![
                "Invalid CSRF Token".to_string(),
                "Could not verify the provided CSRF token".to_string(),
            ],
            token_rejected_status: 403,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub base_url: Url,
    pub auth_url: Url,
    pub profile_url: Url,
    pub timeout: Duration,
    pub csrf_refresh_interval: Duration,
    pub markers: PortalMarkers,
}

impl PortalConfig {
    /// # Errors
    /// Returns an error if any of the URLs cannot be parsed.
    pub fn new(base_url: &str, auth_url: &str, profile_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url).with_context(|| format!("invalid base URL: {base_url}"))?,
            auth_url: Url::parse(auth_url).with_context(|| format!("invalid auth URL: {auth_url}"))?,
            profile_url: Url::parse(profile_url)
                .with_context(|| format!("invalid profile URL: {profile_url}"))?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            csrf_refresh_interval: Duration::from_secs(DEFAULT_CSRF_REFRESH_INTERVAL_SECONDS),
            markers: PortalMarkers::default(),
        })
    }

    /// Point every endpoint at `origin`, keeping the portal's paths.
    ///
    /// # Errors
    /// Returns an error if `origin` is not a valid base URL.
    pub fn for_origin(origin: &str) -> Result<Self> {
        let origin = origin.trim_end_matches('/');
        Self::new(
            &format!("{origin}/Academy/"),
            &format!("{origin}/Academy/j_spring_security_check"),
            &format!("{origin}/Academy/s/studentProfilePESUAdmin"),
        )
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_csrf_refresh_interval(mut self, interval: Duration) -> Self {
        self.csrf_refresh_interval = interval;
        self
    }

    #[must_use]
    pub fn with_markers(mut self, markers: PortalMarkers) -> Self {
        self.markers = markers;
        self
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        // The defaults are constants known to parse.
        Self::new(DEFAULT_BASE_URL, DEFAULT_AUTH_URL, DEFAULT_PROFILE_URL)
            .unwrap_or_else(|e| unreachable!("default portal URLs must parse: {e}"))
    }
}
