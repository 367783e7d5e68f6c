// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! CLI command definitions for asset-gateway

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(name = "asset-gateway", about, long_about = None, version = crate::VERSION_INFO.as_str())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the resource listing API over HTTP.
    Serve(Serve),
}

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Serve {
    /// Port to listen on. Defaults to $PORT, then 3000
    #[arg(long, short = 'p')]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Address to bind. Defaults to 0.0.0.0
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Include upstream error messages in 500 responses (for development)
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub expose_error_details: bool,

    /// Set environment variables (KEY=VALUE format). Can be specified multiple times.
    #[arg(long = "env", value_parser = crate::parse_env_var)]
    #[serde(skip)]
    pub env_vars: Vec<(String, String)>,

    /// Load environment variables from a file (supports .env format). Defaults to ./.env if present
    #[arg(long = "env-file")]
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}
