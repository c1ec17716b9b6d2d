// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

// Allow println/eprintln in CLI client - these are for direct user output, not logging
#![allow(clippy::disallowed_macros)]

pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod operations;
pub mod poll;
pub mod presets;
pub mod shell;
mod spinner;
pub mod testing;
pub mod workflow;

// Re-export for convenience
pub use commands::{App, MenuCommand};
pub use config::Config;
pub use error::ApiError;
pub use gateway::{ApiGateway, ApiRequest, ApiResponse, HttpGateway};
pub use operations::LiveStreamApi;
pub use workflow::{AutoAdvance, Orchestrator, Stage, StepGate, WorkflowOutcome};

/// Builds the HTTP-backed application from a validated configuration.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built from `config`.
pub fn connect(config: &Config) -> Result<App<HttpGateway>, ApiError> {
    Ok(App::new(HttpGateway::new(config)?, config))
}

/// Start the interactive menu.
///
/// # Errors
///
/// Returns an error if:
/// - The HTTP client cannot be built from `config`
/// - Terminal readline initialization fails
pub async fn start_shell(config: &Config) -> anyhow::Result<()> {
    let mut shell = shell::Shell::new(connect(config)?)?;
    shell.run().await
}
