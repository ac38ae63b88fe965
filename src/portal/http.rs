//! HTTP plumbing towards the portal and classification of its HTML replies.

use crate::{portal::config::PortalConfig, APP_USER_AGENT};
use reqwest::{
    cookie::{CookieStore, Jar},
    Client, StatusCode,
};
use scraper::{Html, Selector};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

/// Status and body of one portal reply.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub status: StatusCode,
    pub body: String,
}

/// What a login submission amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResponse {
    Success,
    CredentialsRejected,
    TokenRejected,
    Unrecognized(String),
}

/// Entry point for every request made to the portal.
#[derive(Clone, Debug)]
pub struct PortalClient {
    config: Arc<PortalConfig>,
}

impl PortalClient {
    #[must_use]
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    fn http(&self, jar: Arc<Jar>) -> Result<Client, reqwest::Error> {
        Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(self.config.timeout)
            .cookie_provider(jar)
            .build()
    }

    /// GET the login page in a fresh session.
    ///
    /// Returns the reply and the session cookies it set, as a `Cookie` header value.
    ///
    /// # Errors
    /// Returns an error on any transport failure or timeout.
    pub async fn fetch_login_page(&self) -> Result<(PortalResponse, Option<String>), reqwest::Error> {
        let jar = Arc::new(Jar::default());
        let client = self.http(Arc::clone(&jar))?;
        let url = self.config.base_url.clone();

        let span = info_span!("portal.login_page", http.method = "GET", url = %url);
        let response = client.get(url.clone()).send().instrument(span).await?;
        let status = response.status();
        let body = response.text().await?;

        let cookies = jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_string));

        debug!(%status, has_cookies = cookies.is_some(), "login page fetched");

        Ok((PortalResponse { status, body }, cookies))
    }

    /// GET the portal's base URL in a throwaway session and return the status.
    ///
    /// # Errors
    /// Returns an error on any transport failure or timeout.
    pub async fn probe(&self) -> Result<StatusCode, reqwest::Error> {
        let client = self.http(Arc::new(Jar::default()))?;
        let url = self.config.base_url.clone();

        let span = info_span!("portal.probe", http.method = "GET", url = %url);
        let status = client.get(url).send().instrument(span).await?.status();
        debug!(%status, "portal probed");

        Ok(status)
    }

    /// Open a per-request session seeded with the cookies the token was issued under.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn session(&self, cookies: Option<&str>) -> Result<PortalSession, reqwest::Error> {
        let jar = Arc::new(Jar::default());
        if let Some(cookies) = cookies {
            for pair in cookies.split(';').map(str::trim).filter(|p| !p.is_empty()) {
                jar.add_cookie_str(&format!("{pair}; Path=/"), &self.config.base_url);
            }
        }

        Ok(PortalSession {
            client: self.http(jar)?,
            config: Arc::clone(&self.config),
        })
    }
}

/// Cookie-carrying session used for one login and the profile fetch after it.
#[derive(Debug)]
pub struct PortalSession {
    client: Client,
    config: Arc<PortalConfig>,
}

impl PortalSession {
    /// POST the credentials and token to the login endpoint.
    ///
    /// # Errors
    /// Returns an error on any transport failure or timeout.
    pub async fn submit_login(
        &self,
        username: &str,
        password: &SecretString,
        csrf_token: &str,
    ) -> Result<PortalResponse, reqwest::Error> {
        let form = [
            ("_csrf", csrf_token),
            ("j_username", username),
            ("j_password", password.expose_secret()),
        ];

        let url = self.config.auth_url.clone();
        let span = info_span!("portal.login", http.method = "POST", url = %url);
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .instrument(span)
            .await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(PortalResponse { status, body })
    }

    /// GET the student profile page.
    ///
    /// # Errors
    /// Returns an error on any transport failure or timeout.
    pub async fn fetch_profile(&self) -> Result<PortalResponse, reqwest::Error> {
        let cache_buster = chrono::Utc::now().timestamp_millis().to_string();
        let query = [
            ("menuId", "670"),
            ("url", "studentProfilePESUAdmin"),
            ("controllerMode", "6414"),
            ("actionType", "5"),
            ("id", "0"),
            ("selectedData", "0"),
            ("_", cache_buster.as_str()),
        ];

        let url = self.config.profile_url.clone();
        let span = info_span!("portal.profile", http.method = "GET", url = %url);
        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .instrument(span)
            .await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(PortalResponse { status, body })
    }
}

/// Pull the anti-forgery token out of a portal page.
#[must_use]
pub fn extract_csrf_token(html: &str, meta_selector: &str) -> Option<String> {
    let selector = Selector::parse(meta_selector).ok()?;
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .and_then(|node| node.value().attr("content"))
        .map(|value| value.trim().to_string())
}

/// Decide what a login reply means.
///
/// Token rejection is checked first, since the portal re-renders the login
/// form on that page as well.
#[must_use]
pub fn classify_login(response: &PortalResponse, config: &PortalConfig) -> LoginResponse {
    let markers = &config.markers;

    if response.status.as_u16() == markers.token_rejected_status
        || markers
            .token_rejected_patterns
            .iter()
            .any(|pattern| response.body.contains(pattern.as_str()))
    {
        return LoginResponse::TokenRejected;
    }

    if !response.status.is_success() {
        return LoginResponse::Unrecognized(format!("unexpected status {}", response.status));
    }

    let document = Html::parse_document(&response.body);
    let matches = |selector: &str| {
        Selector::parse(selector)
            .ok()
            .is_some_and(|selector| document.select(&selector).next().is_some())
    };

    if matches(&markers.login_form_selector) {
        LoginResponse::CredentialsRejected
    } else if matches(&markers.csrf_meta_selector) {
        LoginResponse::Success
    } else {
        LoginResponse::Unrecognized("no known marker in the login response".to_string())
    }
}
