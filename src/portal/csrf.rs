//! Anti-forgery token cache for the portal's login form.
//!
//! Flow Overview:
//! 1. `get` serves the cached token under a shared read lock, so readers of a
//!    valid token never serialize on each other.
//! 2. On a miss, callers queue on the fetch lock. The first one fetches the
//!    login page; the rest find the fresh token (or the shared failure) when
//!    they get the lock, so one miss costs one upstream request. Only failures
//!    of these foreground fetches are shared.
//! 3. `invalidate_token` drops a token the portal refused, unless it was
//!    already replaced.
//! 4. `spawn_refresher` re-fetches on a fixed interval to keep the cache warm.
//!    Its failures are counted and logged, never surfaced to callers.

use crate::portal::{
    error::CsrfTokenError,
    http::{extract_csrf_token, PortalClient},
    metrics::{Counter, MetricsCollector},
};
use chrono::{DateTime, Utc};
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{
    sync::{oneshot, Mutex, RwLock},
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, error, info, instrument, warn};

/// A token together with the session cookies it was issued under.
#[derive(Clone)]
pub struct CsrfToken {
    value: String,
    fetched_at: DateTime<Utc>,
    cookies: Option<String>,
}

impl CsrfToken {
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    #[must_use]
    pub fn cookies(&self) -> Option<&str> {
        self.cookies.as_deref()
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfToken")
            .field("value", &"***")
            .field("fetched_at", &self.fetched_at)
            .field("cookies", &self.cookies.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Default)]
struct FetchState {
    last_error: Option<Arc<CsrfTokenError>>,
}

pub struct CsrfTokenManager {
    portal: PortalClient,
    cached: RwLock<Option<Arc<CsrfToken>>>,
    fetch_lock: Mutex<FetchState>,
    // Fetches started by `get`; the refresher never moves it.
    foreground: AtomicU64,
    fetches: AtomicU64,
}

impl fmt::Debug for CsrfTokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfTokenManager")
            .field("portal", &self.portal)
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}

impl CsrfTokenManager {
    #[must_use]
    pub fn new(portal: PortalClient) -> Self {
        Self {
            portal,
            cached: RwLock::new(None),
            fetch_lock: Mutex::new(FetchState::default()),
            foreground: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Number of upstream token fetches completed so far, successful or not,
    /// including background refreshes.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Acquire)
    }

    /// Return the cached token, fetching one if the cache is empty.
    ///
    /// # Errors
    /// Returns [`CsrfTokenError`] if the token cannot be fetched.
    pub async fn get(&self) -> Result<Arc<CsrfToken>, CsrfTokenError> {
        if let Some(token) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(token));
        }

        let seen = self.foreground.load(Ordering::Acquire);
        let mut state = self.fetch_lock.lock().await;

        if let Some(token) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(token));
        }

        // A foreground fetch finished while we were queued and the cache is
        // still empty, so it failed: share its outcome instead of hitting the
        // portal again.
        if self.foreground.load(Ordering::Acquire) != seen {
            if let Some(error) = &state.last_error {
                return Err(CsrfTokenError::Shared(Arc::clone(error)));
            }
        }

        let result = self.fetch_and_store().await.map_err(Arc::new);
        state.last_error = match &result {
            Ok(_) => None,
            Err(e) => Some(Arc::clone(e)),
        };
        self.foreground.fetch_add(1, Ordering::AcqRel);

        result.map_err(CsrfTokenError::Shared)
    }

    /// Fetch a new token and replace the cached one.
    ///
    /// A failure here is returned to the caller only; callers of `get` queued
    /// behind it still run their own fetch.
    ///
    /// # Errors
    /// Returns [`CsrfTokenError`] if the token cannot be fetched; the cache is left untouched.
    pub async fn refresh(&self) -> Result<Arc<CsrfToken>, CsrfTokenError> {
        let _guard = self.fetch_lock.lock().await;
        self.fetch_and_store().await
    }

    /// Drop the cached token so the next `get` fetches a new one.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
        debug!("CSRF token invalidated");
    }

    /// Drop `stale` if it is still the cached token.
    pub async fn invalidate_token(&self, stale: &Arc<CsrfToken>) {
        let mut cached = self.cached.write().await;
        if cached.as_ref().is_some_and(|current| Arc::ptr_eq(current, stale)) {
            *cached = None;
            debug!("stale CSRF token invalidated");
        }
    }

    // Callers hold the fetch lock.
    async fn fetch_and_store(&self) -> Result<Arc<CsrfToken>, CsrfTokenError> {
        let result = self.fetch().await;
        self.fetches.fetch_add(1, Ordering::AcqRel);

        let token = Arc::new(result?);
        *self.cached.write().await = Some(Arc::clone(&token));
        Ok(token)
    }

    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<CsrfToken, CsrfTokenError> {
        info!("Fetching a new unauthenticated CSRF token");

        let (response, cookies) = self
            .portal
            .fetch_login_page()
            .await
            .map_err(CsrfTokenError::Transport)?;

        if !response.status.is_success() {
            return Err(CsrfTokenError::Status(response.status));
        }

        let value = extract_csrf_token(
            &response.body,
            &self.portal.config().markers.csrf_meta_selector,
        )
        .ok_or(CsrfTokenError::Missing)?;

        if value.is_empty() {
            return Err(CsrfTokenError::Empty);
        }

        debug!(token_length = value.len(), "fetched CSRF token");

        Ok(CsrfToken {
            value,
            fetched_at: Utc::now(),
            cookies,
        })
    }

    /// Spawn the periodic refresh task.
    #[must_use]
    pub fn spawn_refresher(
        self: &Arc<Self>,
        interval: Duration,
        metrics: Arc<MetricsCollector>,
    ) -> RefreshTask {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let manager = Arc::clone(self);

        let handle = tokio::spawn(async move {
            info!(
                interval_seconds = interval.as_secs(),
                "Started the CSRF token refresh task"
            );

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    () = async {
                        sleep(interval).await;
                        manager.refresh_and_record(&metrics).await;
                    } => {}
                }
            }

            debug!("CSRF token refresh task stopped");
        });

        RefreshTask {
            stop: Some(stop_tx),
            handle,
        }
    }

    async fn refresh_and_record(&self, metrics: &MetricsCollector) {
        match self.refresh().await {
            Ok(_) => {
                metrics.incr(Counter::CsrfTokenRefreshSuccess);
                info!("CSRF token refreshed");
            }
            Err(e) => {
                metrics.incr(Counter::CsrfTokenRefreshFailure);
                error!("Failed to refresh CSRF token in the background: {}", e);
            }
        }
    }
}

/// Handle on the background refresh task.
#[derive(Debug)]
pub struct RefreshTask {
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RefreshTask {
    /// Stop the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.handle).await {
            warn!("CSRF token refresh task ended abnormally: {}", e);
        }
    }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
