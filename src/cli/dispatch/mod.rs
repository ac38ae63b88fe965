//! Map parsed command-line arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{portal, ARG_CORS_ALLOW_ORIGIN, ARG_HOST, ARG_PORT};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or empty.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let host = matches
        .get_one::<String>(ARG_HOST)
        .cloned()
        .context("missing required argument: --host")?;
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(5000);
    let cors_allow_origin = matches
        .get_one::<String>(ARG_CORS_ALLOW_ORIGIN)
        .cloned()
        .unwrap_or_else(|| "*".to_string());

    let portal_opts = portal::Options::parse(matches)?;

    Ok(Action::Server(Args {
        host,
        port,
        cors_allow_origin,
        base_url: portal_opts.base_url,
        auth_url: portal_opts.auth_url,
        profile_url: portal_opts.profile_url,
        timeout_seconds: portal_opts.timeout_seconds,
        csrf_refresh_interval_seconds: portal_opts.csrf_refresh_interval_seconds,
    }))
}
