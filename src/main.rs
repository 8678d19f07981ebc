//! uncle - CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use uncle::cli::{Cli, execute};
use uncle::core::logging::{self, LogConfig};
use uncle::render::render_error;
use uncle::util::env::should_color_errors;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&LogConfig::resolve(
        cli.log_level.as_deref(),
        cli.json_output,
        cli.verbose,
    ));

    match execute(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = %e.error_code(), "{e}");
            eprintln!("{}", render_error(&e, should_color_errors(cli.no_color)));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
