// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! The client-facing shape of a listed asset.

use serde::Serialize;

use crate::provider::AssetRecord;

/// Client-facing descriptor of a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSummary {
    pub public_id: String,
    pub src: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    pub bytes: u64,
    pub created_at: String,
}

impl From<AssetRecord> for AssetSummary {
    fn from(record: AssetRecord) -> Self {
        Self {
            public_id: record.public_id,
            src: record.secure_url,
            format: record.format,
            width: record.width,
            height: record.height,
            bytes: record.bytes,
            created_at: record.created_at,
        }
    }
}

/// Projects provider records into summaries, keeping their order.
pub fn project(records: Vec<AssetRecord>) -> Vec<AssetSummary> {
    records.into_iter().map(AssetSummary::from).collect()
}
