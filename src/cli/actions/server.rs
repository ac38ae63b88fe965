use crate::{
    pesuauth,
    portal::{AuthenticationClient, MetricsCollector, PortalConfig},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct Args {
    pub host: String,
    pub port: u16,
    pub cors_allow_origin: String,
    pub base_url: String,
    pub auth_url: String,
    pub profile_url: String,
    pub timeout_seconds: u64,
    pub csrf_refresh_interval_seconds: u64,
}

impl Args {
    /// Portal settings for these arguments.
    ///
    /// # Errors
    /// Returns an error if any of the portal URLs is invalid.
    pub fn portal_config(&self) -> Result<PortalConfig> {
        Ok(
            PortalConfig::new(&self.base_url, &self.auth_url, &self.profile_url)
                .context("Invalid PESU Academy URL")?
                .with_timeout(Duration::from_secs(self.timeout_seconds))
                .with_csrf_refresh_interval(Duration::from_secs(
                    self.csrf_refresh_interval_seconds,
                )),
        )
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.portal_config()?;
    let refresh_interval = config.csrf_refresh_interval;

    debug!("Portal config: {:?}", config);

    let metrics = Arc::new(MetricsCollector::new());
    let client = Arc::new(AuthenticationClient::new(config, Arc::clone(&metrics)));

    // The request path fetches on demand, so a cold cache is not fatal.
    match client.tokens().get().await {
        Ok(token) => info!(fetched_at = %token.fetched_at(), "CSRF token cache warmed"),
        Err(e) => warn!("Could not warm the CSRF token cache: {}", e),
    }

    let refresher = if refresh_interval.is_zero() {
        info!("Background CSRF token refresh disabled");
        None
    } else {
        Some(
            client
                .tokens()
                .spawn_refresher(refresh_interval, Arc::clone(&metrics)),
        )
    };

    let served = pesuauth::new(&args.host, args.port, client, &args.cors_allow_origin).await;

    if let Some(refresher) = refresher {
        refresher.shutdown().await;
    }

    served
}
