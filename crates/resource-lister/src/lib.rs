// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Lists media assets under a folder prefix, following the provider's
//! continuation cursors until the requested number of assets is collected.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

mod cloudinary;
mod provider;
mod summary;

pub use cloudinary::{CloudinaryClient, CloudinaryConfig, ConfigError};
pub use provider::{AssetProvider, AssetRecord, PageQuery, ProviderError, ProviderPage};
pub use summary::{project, AssetSummary};

/// Number of results returned when the caller does not ask for a specific amount.
pub const DEFAULT_MAX_RESULTS: u32 = 500;

/// Upper bound on the number of results a single listing may return.
pub const MAX_RESULTS_CEILING: u32 = 1000;

/// Largest page the provider serves in one call.
pub const PROVIDER_PAGE_LIMIT: u32 = 500;

/// Delivery type of every asset the gateway lists.
pub const DELIVERY_TYPE_UPLOAD: &str = "upload";

/// Errors produced while listing assets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("Folder path required")]
    InvalidRequest,
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("listing did not finish within {0:?}")]
    DeadlineExceeded(Duration),
}

/// A validated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    prefix: String,
    max_results: u32,
}

impl ListingRequest {
    /// Validates `prefix` and clamps `max_results` into `1..=MAX_RESULTS_CEILING`.
    pub fn new(prefix: impl Into<String>, max_results: u32) -> Result<Self, ListError> {
        let prefix = prefix.into();
        if prefix.trim().is_empty() {
            return Err(ListError::InvalidRequest);
        }
        Ok(Self {
            prefix,
            max_results: clamp_max_results(max_results),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn max_results(&self) -> u32 {
        self.max_results
    }
}

/// Clamps a requested result count into `1..=MAX_RESULTS_CEILING`.
pub fn clamp_max_results(requested: u32) -> u32 {
    requested.clamp(1, MAX_RESULTS_CEILING)
}

/// Drives the provider's pagination for a single prefix.
#[derive(Debug, Clone)]
pub struct ResourceLister<P> {
    provider: P,
    deadline: Option<Duration>,
}

impl<P: AssetProvider> ResourceLister<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            deadline: None,
        }
    }

    /// Bounds the wall-clock time of a whole listing, across all of its pages.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Lists up to `max_results` assets whose public id starts with `prefix`.
    ///
    /// Pages are requested one after another, each asking for at most
    /// [`PROVIDER_PAGE_LIMIT`] records and never more than are still missing,
    /// so the result never exceeds the (clamped) cap. Any provider failure, or
    /// running past the deadline, aborts the listing.
    pub async fn list(
        &self,
        prefix: &str,
        max_results: u32,
    ) -> Result<Vec<AssetSummary>, ListError> {
        let request = ListingRequest::new(prefix, max_results)?;
        self.list_request(&request).await
    }

    #[instrument(skip_all, fields(prefix = %request.prefix(), max_results = request.max_results()))]
    pub async fn list_request(
        &self,
        request: &ListingRequest,
    ) -> Result<Vec<AssetSummary>, ListError> {
        let Some(deadline) = self.deadline else {
            return self.collect(request).await;
        };
        match tokio::time::timeout(deadline, self.collect(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?deadline, "Listing deadline exceeded, discarding partial results");
                Err(ListError::DeadlineExceeded(deadline))
            }
        }
    }

    async fn collect(&self, request: &ListingRequest) -> Result<Vec<AssetSummary>, ListError> {
        let cap = request.max_results() as usize;
        // Every call that makes progress adds at least one record.
        let max_calls = cap;

        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut calls = 0usize;

        loop {
            let remaining = (cap - records.len()) as u32;
            let query = PageQuery {
                delivery_type: DELIVERY_TYPE_UPLOAD,
                prefix: request.prefix(),
                max_results: remaining.min(PROVIDER_PAGE_LIMIT),
                next_cursor: cursor.as_deref(),
            };
            debug!(
                per_call_limit = query.max_results,
                has_cursor = query.next_cursor.is_some(),
                "Requesting page"
            );

            let page = self.provider.list_page(query).await?;
            calls += 1;

            let received = page.resources.len();
            records.extend(page.resources);
            // Guard against providers that overfill a page.
            records.truncate(cap);
            debug!(received, total = records.len(), "Received page");

            let next = match page.next_cursor {
                Some(next) if records.len() < cap => next,
                _ => break,
            };
            if cursor.as_deref() == Some(next.as_str()) {
                warn!(calls, "Provider repeated its continuation cursor, stopping");
                break;
            }
            if calls >= max_calls {
                warn!(calls, "Reached page ceiling before exhausting cursor, stopping");
                break;
            }
            cursor = Some(next);
        }

        info!(calls, count = records.len(), "Listed resources");
        Ok(project(records))
    }
}
