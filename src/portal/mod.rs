//! Authentication engine for PESU Academy.
//!
//! The portal has no API: a login means fetching the login page for its
//! anti-forgery token, posting the credentials with that token and reading
//! the HTML that comes back. The profile page is scraped the same way.

pub mod client;
pub mod config;
pub mod csrf;
pub mod error;
pub mod http;
pub mod metrics;
pub mod profile;
pub mod types;

pub use self::client::AuthenticationClient;
pub use self::config::{PortalConfig, PortalMarkers};
pub use self::csrf::{CsrfToken, CsrfTokenManager, RefreshTask};
pub use self::error::{AuthError, CsrfTokenError, ErrorKind, ProfileParseError};
pub use self::metrics::{Counter, MetricsCollector, MetricsReport, MetricsSnapshot};
pub use self::types::{AuthRequest, AuthResult, Outcome, ProfileData, ProfileField};
