pub mod logging;
pub mod portal;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_HOST: &str = "host";
pub const ARG_PORT: &str = "port";
pub const ARG_CORS_ALLOW_ORIGIN: &str = "cors-allow-origin";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("pesuauth")
        .about("Authentication API for PESU Academy")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_HOST)
                .long("host")
                .help("Address to listen on")
                .default_value("::")
                .env("PESUAUTH_HOST"),
        )
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("5000")
                .env("PESUAUTH_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_CORS_ALLOW_ORIGIN)
                .long("cors-allow-origin")
                .help("Allowed CORS origins, comma separated, or * for any")
                .default_value("*")
                .env("PESUAUTH_CORS_ALLOW_ORIGIN"),
        );

    let command = portal::with_args(command);
    logging::with_args(command)
}
