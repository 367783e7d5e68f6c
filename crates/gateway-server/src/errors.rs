// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Every failure the HTTP surface reports to clients.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Folder path required")]
    FolderRequired,
    /// The provider failed; `details` is only set when the gateway exposes them.
    #[error("Cloudinary error")]
    Upstream { details: Option<String> },
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
}

#[derive(Serialize)]
struct ApiErrBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::FolderRequired => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            ApiError::Upstream { details } => details.clone(),
            _ => None,
        };
        HttpResponse::build(self.status_code()).json(ApiErrBody {
            error: self.to_string(),
            details,
        })
    }
}

/// Replaces every occurrence of a secret with a placeholder.
pub fn redact(message: &str, secrets: &[String]) -> String {
    secrets
        .iter()
        .filter(|secret| !secret.is_empty())
        .fold(message.to_string(), |acc, secret| {
            acc.replace(secret.as_str(), "[REDACTED]")
        })
}
