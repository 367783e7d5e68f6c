// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The seam between the lister and the remote asset provider.

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

/// One call's worth of listing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery<'a> {
    /// Delivery type of the assets, `"upload"` for everything the gateway lists.
    pub delivery_type: &'a str,
    /// Folder-like prefix the provider filters on.
    pub prefix: &'a str,
    /// Maximum number of records this call may return.
    pub max_results: u32,
    /// Cursor returned by the previous page, absent on the first call.
    pub next_cursor: Option<&'a str>,
}

/// A single page of results as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderPage {
    #[serde(default)]
    pub resources: Vec<AssetRecord>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Provider-native asset record. Fields the gateway does not expose are dropped on decode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetRecord {
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub width: Option<u64>,
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub created_at: String,
}

/// Failures reported by a provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },
    #[error("request to provider timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed provider response: {0}")]
    Decode(String),
}

/// A source of paginated asset listings.
///
/// Implementations perform exactly one upstream call per invocation; pagination
/// is driven by [`crate::ResourceLister`].
pub trait AssetProvider: Send + Sync {
    fn list_page(
        &self,
        query: PageQuery<'_>,
    ) -> impl Future<Output = Result<ProviderPage, ProviderError>> + Send;
}

impl<P: AssetProvider> AssetProvider for std::sync::Arc<P> {
    fn list_page(
        &self,
        query: PageQuery<'_>,
    ) -> impl Future<Output = Result<ProviderPage, ProviderError>> + Send {
        (**self).list_page(query)
    }
}
