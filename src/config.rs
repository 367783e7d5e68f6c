// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use etcetera::BaseStrategy;
use figment::providers::{Env, Format, Serialized, Toml};
use resource_lister::CloudinaryConfig;
use serde::{Deserialize, Deserializer, Serialize};

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_api_base_url() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_resource_type() -> String {
    "image".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_listing_timeout_secs() -> u64 {
    120
}

const CREDENTIAL_KEYS: [&str; 3] = ["cloud_name", "api_key", "api_secret"];

/// Reads `{prefix}CLOUD_NAME`, `{prefix}API_KEY` and `{prefix}API_SECRET` verbatim.
/// figment's `Env` would parse `0123` as the integer 123.
fn credentials_from_env(prefix: &str) -> BTreeMap<&'static str, String> {
    CREDENTIAL_KEYS
        .iter()
        .filter_map(|key| {
            let name = format!("{prefix}{}", key.to_ascii_uppercase());
            std::env::var(name).ok().map(|value| (*key, value))
        })
        .collect()
}

/// Numeric TOML values (`api_key = 1234`) are accepted as strings.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

/// Configuration for the asset gateway
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Cloudinary cloud name
    #[serde(default, deserialize_with = "string_or_number")]
    pub cloud_name: String,

    /// Cloudinary API key
    #[serde(default, deserialize_with = "string_or_number")]
    pub api_key: String,

    /// Cloudinary API secret
    #[serde(default, skip_serializing, deserialize_with = "string_or_number")]
    pub api_secret: String,

    /// Root URL of the Cloudinary Admin API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Resource type to list (`image`, `video` or `raw`)
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    /// Timeout for each call to Cloudinary, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on a whole paginated listing, in seconds
    #[serde(default = "default_listing_timeout_secs")]
    pub listing_timeout_secs: u64,

    /// Whether 500 responses carry the upstream error message
    #[serde(default)]
    pub expose_error_details: bool,
}

impl Config {
    /// Returns a new [`Config`] instance by merging the configuration from the specified
    /// `cli_config` (any struct that is Serialize/Deserialize, but generally a Clap `Parser`) with
    /// the configuration file and environment variables. By default, the configuration file is
    /// located at `$XDG_CONFIG_HOME/asset-gateway/config.toml`. This can be overridden by setting
    /// the `ASSET_GATEWAY_CONFIG_FILE` environment variable.
    ///
    /// The order of precedence for configuration sources is as follows:
    /// 1. Values from `cli_config`
    /// 2. Environment variables prefixed with `ASSET_GATEWAY_`
    /// 3. `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` and `PORT`
    /// 4. Configuration file specified by `ASSET_GATEWAY_CONFIG_FILE` or default location
    pub fn new<T: Serialize>(cli_config: &T) -> Result<Self, anyhow::Error> {
        let config_file_path = match std::env::var_os("ASSET_GATEWAY_CONFIG_FILE") {
            Some(path) => PathBuf::from(path),
            None => etcetera::choose_base_strategy()
                .context("Unable to get home directory")?
                .config_dir()
                .join("asset-gateway")
                .join("config.toml"),
        };
        Self::new_from_path(cli_config, config_file_path)
    }

    /// Same as [`Config::new`], but allows specifying a custom path for the configuration file.
    pub fn new_from_path<T: Serialize>(
        cli_config: &T,
        config_file_path: impl AsRef<Path>,
    ) -> Result<Self, anyhow::Error> {
        figment::Figment::new()
            .admerge(Toml::file(config_file_path))
            .admerge(Serialized::defaults(credentials_from_env("CLOUDINARY_")))
            .admerge(Env::raw().only(&["port"]))
            .admerge(
                Env::prefixed("ASSET_GATEWAY_")
                    .ignore(&["config_file", "cloud_name", "api_key", "api_secret"]),
            )
            .admerge(Serialized::defaults(credentials_from_env("ASSET_GATEWAY_")))
            .admerge(Serialized::defaults(cli_config))
            .extract()
            .context("Unable to merge configs")
    }

    /// Bound on a whole listing, across all of its pages.
    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    /// Provider settings derived from this configuration.
    pub fn cloudinary(&self) -> CloudinaryConfig {
        CloudinaryConfig::new(&self.cloud_name, &self.api_key, &self.api_secret)
            .with_api_base_url(&self.api_base_url)
            .with_resource_type(&self.resource_type)
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}
