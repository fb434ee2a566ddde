//! `regfs print-config` — Show the effective configuration.

use std::process::ExitCode;

use regfs_common::config::RegfsConfig;

/// Executes the `print-config` command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized.
#[allow(clippy::print_stdout)]
pub fn execute(config: &RegfsConfig) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(ExitCode::SUCCESS)
}
