use crate::portal::config::{
    DEFAULT_AUTH_URL, DEFAULT_BASE_URL, DEFAULT_CSRF_REFRESH_INTERVAL_SECONDS,
    DEFAULT_PROFILE_URL, DEFAULT_TIMEOUT_SECONDS,
};
use clap::{Arg, ArgMatches, Command};

pub const ARG_BASE_URL: &str = "base-url";
pub const ARG_AUTH_URL: &str = "auth-url";
pub const ARG_PROFILE_URL: &str = "profile-url";
pub const ARG_TIMEOUT: &str = "timeout";
pub const ARG_CSRF_REFRESH_INTERVAL: &str = "csrf-refresh-interval";

#[derive(Debug)]
pub struct Options {
    pub base_url: String,
    pub auth_url: String,
    pub profile_url: String,
    pub timeout_seconds: u64,
    pub csrf_refresh_interval_seconds: u64,
}

impl Options {
    /// Parse PESU Academy arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a URL argument is empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };

        Ok(Self {
            base_url: read_required(ARG_BASE_URL)?,
            auth_url: read_required(ARG_AUTH_URL)?,
            profile_url: read_required(ARG_PROFILE_URL)?,
            timeout_seconds: matches
                .get_one::<u64>(ARG_TIMEOUT)
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            csrf_refresh_interval_seconds: matches
                .get_one::<u64>(ARG_CSRF_REFRESH_INTERVAL)
                .copied()
                .unwrap_or(DEFAULT_CSRF_REFRESH_INTERVAL_SECONDS),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BASE_URL)
                .long("base-url")
                .help("PESU Academy login page, source of the CSRF token")
                .env("PESUAUTH_BASE_URL")
                .default_value(DEFAULT_BASE_URL),
        )
        .arg(
            Arg::new(ARG_AUTH_URL)
                .long("auth-url")
                .help("PESU Academy login form endpoint")
                .env("PESUAUTH_AUTH_URL")
                .default_value(DEFAULT_AUTH_URL),
        )
        .arg(
            Arg::new(ARG_PROFILE_URL)
                .long("profile-url")
                .help("PESU Academy student profile page")
                .env("PESUAUTH_PROFILE_URL")
                .default_value(DEFAULT_PROFILE_URL),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long("timeout")
                .help("Timeout in seconds for each request to PESU Academy")
                .env("PESUAUTH_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_CSRF_REFRESH_INTERVAL)
                .long("csrf-refresh-interval")
                .help("Seconds between background CSRF token refreshes, 0 disables them")
                .env("PESUAUTH_CSRF_REFRESH_INTERVAL")
                .default_value("2700")
                .value_parser(clap::value_parser!(u64)),
        )
}
