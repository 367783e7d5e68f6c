// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The main `asset-gateway(1)` command.

#![warn(missing_docs)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use anyhow::{Context, Result};
use clap::Parser;
use gateway_server::{Gateway, GatewayOptions};
use resource_lister::{CloudinaryClient, ResourceLister};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

mod commands;
mod config;


use commands::{Cli, Commands, Serve};

// Create a static version string that can be used by clap
static VERSION_INFO: LazyLock<String> = LazyLock::new(format_build_info);
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

const DEFAULT_ENV_FILE: &str = ".env";

/// Formats build information for `--version`
fn format_build_info() -> String {
    // Expected format: "rustc 1.88.0 (extra info)"
    let rust_version = built_info::RUSTC_VERSION
        .split_whitespace()
        .find(|part| part.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .unwrap_or("unknown");

    format!(
        "{} version.BuildInfo{{RustVersion:\"{}\", BuildProfile:\"{}\", Target:\"{}\"}}",
        built_info::PKG_VERSION,
        rust_version,
        built_info::PROFILE,
        built_info::TARGET,
    )
}

/// Parses a `KEY=VALUE` pair given on the command line.
fn parse_env_var(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Environment variable must be in KEY=VALUE format, got '{s}'"))?;
    if key.is_empty() {
        return Err("Environment variable key cannot be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

/// Reads a `.env`-style file: `KEY=VALUE` lines, `#` comments, blank lines and
/// optionally quoted values.
fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read environment file: {}", path.display()))?;

    let mut vars = HashMap::new();
    for (line_number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            anyhow::bail!(
                "Invalid environment variable format at {}:{}: {}",
                path.display(),
                line_number + 1,
                line
            );
        };
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        vars.insert(key.trim().to_string(), value.to_string());
    }
    Ok(vars)
}

/// Applies `.env` values (without overriding the real environment), then the
/// explicit `--env` pairs. Must run before any other thread reads the environment.
fn apply_environment(cfg: &Serve) -> Result<()> {
    let env_file = match &cfg.env_file {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_ENV_FILE)).filter(|p| p.is_file()),
    };
    if let Some(path) = env_file {
        for (key, value) in load_env_file(&path)? {
            if std::env::var_os(&key).is_none() {
                std::env::set_var(key, value);
            }
        }
    }
    for (key, value) in &cfg.env_vars {
        std::env::set_var(key, value);
    }
    Ok(())
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".to_string().into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run_serve(cfg: &Serve) -> Result<()> {
    let config = config::Config::new(cfg).context("Failed to load configuration")?;

    let cloudinary = config.cloudinary();
    let client = CloudinaryClient::new(&cloudinary).context("Invalid Cloudinary configuration")?;
    let options = GatewayOptions {
        expose_error_details: config.expose_error_details,
        redacted: cloudinary.secrets(),
    };
    let lister = ResourceLister::new(client).with_deadline(config.listing_timeout());
    let gateway = Arc::new(Gateway::new(lister, options));

    let listener = std::net::TcpListener::bind((config.bind.as_str(), config.port))
        .with_context(|| format!("Failed to bind {}:{}", config.bind, config.port))?;

    tracing::info!(
        cloud_name = %cloudinary.cloud_name,
        expose_error_details = config.expose_error_details,
        "Starting asset gateway"
    );

    // Stops gracefully on SIGINT/SIGTERM.
    gateway_server::serve(listener, gateway)
        .context("Failed to start HTTP server")?
        .await
        .context("Server error")?;

    tracing::info!("Asset gateway shutting down");
    Ok(())
}

#[actix_web::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve(cfg) => {
            apply_environment(cfg)?;
            init_logging();
            run_serve(cfg).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod version_tests {
    use super::*;

    #[test]
    fn test_version_format_contains_required_fields() {
        let version_info = format_build_info();

        assert!(version_info.contains("version.BuildInfo"));
        assert!(version_info.contains("RustVersion"));
        assert!(version_info.contains("BuildProfile"));
        assert!(version_info.contains("Target"));
    }

    #[test]
    fn test_version_contains_cargo_version() {
        let version_info = format_build_info();
        assert!(version_info.starts_with(built_info::PKG_VERSION));
    }
}
