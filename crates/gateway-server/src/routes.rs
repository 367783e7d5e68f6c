// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Request handlers and query parsing for the gateway's routes.

use std::num::IntErrorKind;

use actix_web::http::header::ContentType;
use actix_web::{web, HttpRequest, HttpResponse};
use resource_lister::{AssetProvider, DEFAULT_MAX_RESULTS, MAX_RESULTS_CEILING};
use serde::Deserialize;
use url::form_urlencoded;

use crate::errors::ApiError;
use crate::Gateway;

const USAGE: &str = "Asset gateway. API is at /api/resources/{folder}. \
Example: /api/resources/trymygold/gold_chains";

/// The folder captured by the wildcard, already percent-decoded. Absent on
/// the bare `/api/resources` route.
#[derive(Debug, Deserialize)]
pub struct FolderPath {
    #[serde(default)]
    folder: String,
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(USAGE)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub async fn list_resources<P: AssetProvider + 'static>(
    gateway: web::Data<Gateway<P>>,
    path: web::Path<FolderPath>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let assets = gateway
        .list(&path.folder, max_results(req.query_string()))
        .await?;
    Ok(HttpResponse::Ok().json(assets))
}

pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}

pub async fn method_not_allowed() -> Result<HttpResponse, ApiError> {
    Err(ApiError::MethodNotAllowed)
}

/// Reads `max_results` from a query string.
///
/// Missing or non-numeric values fall back to [`DEFAULT_MAX_RESULTS`]; numbers
/// are clamped into `1..=MAX_RESULTS_CEILING`.
pub fn max_results(query: &str) -> u32 {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "max_results")
        .map(|(_, value)| parse_count(&value))
        .unwrap_or(DEFAULT_MAX_RESULTS)
}

fn parse_count(value: &str) -> u32 {
    match value.trim().parse::<i64>() {
        Ok(n) => n.clamp(1, i64::from(MAX_RESULTS_CEILING)) as u32,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => MAX_RESULTS_CEILING,
            IntErrorKind::NegOverflow => 1,
            _ => DEFAULT_MAX_RESULTS,
        },
    }
}
