// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! HTTP front end for [`ResourceLister`].
//!
//! Routes:
//! - `GET /api/resources/{folder...}?max_results=N` lists assets under a folder
//! - `GET /_health` reports liveness
//! - `GET /` prints a short usage hint

use std::net::TcpListener;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use resource_lister::{AssetProvider, AssetSummary, ListError, ResourceLister};
use tracing::{error, info, instrument};

mod errors;
mod routes;

pub use errors::ApiError;

const ALLOWED_METHODS: [&str; 6] = ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"];

/// Behaviour switches for the HTTP surface.
#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    /// Include the upstream error message as `details` in 500 responses.
    pub expose_error_details: bool,
    /// Strings scrubbed from any error detail before it leaves the process.
    pub redacted: Vec<String>,
}

/// State shared by every worker: the lister and how its failures are reported.
pub struct Gateway<P> {
    lister: ResourceLister<P>,
    options: GatewayOptions,
}

impl<P: AssetProvider> Gateway<P> {
    pub fn new(lister: ResourceLister<P>, options: GatewayOptions) -> Self {
        Self { lister, options }
    }

    /// Lists a folder, turning lister failures into client-facing errors.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        folder: &str,
        max_results: u32,
    ) -> Result<Vec<AssetSummary>, ApiError> {
        let err = match self.lister.list(folder, max_results).await {
            Ok(assets) => return Ok(assets),
            Err(ListError::InvalidRequest) => return Err(ApiError::FolderRequired),
            Err(ListError::Provider(err)) => err.to_string(),
            Err(err @ ListError::DeadlineExceeded(_)) => err.to_string(),
        };
        let details = errors::redact(&err, &self.options.redacted);
        error!(error = %details, "Cloudinary listing failed");
        Err(ApiError::Upstream {
            details: self.options.expose_error_details.then_some(details),
        })
    }
}

/// Cross-origin policy: any origin may read, answered with a literal `*`.
pub fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(ALLOWED_METHODS)
        .allow_any_header()
        .max_age(3600)
}

/// Registers the gateway's routes. Expects `web::Data<Gateway<P>>` in the app data.
pub fn configure<P: AssetProvider + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(routes::index))
            .route(web::head().to(routes::index))
            .default_service(web::to(routes::method_not_allowed)),
    )
    .service(
        web::resource("/_health")
            .route(web::get().to(routes::health))
            .route(web::head().to(routes::health))
            .default_service(web::to(routes::method_not_allowed)),
    )
    .service(
        web::resource(["/api/resources", "/api/resources/{folder:.*}"])
            .route(web::get().to(routes::list_resources::<P>))
            .route(web::head().to(routes::list_resources::<P>))
            .default_service(web::to(routes::method_not_allowed)),
    )
    .default_service(web::to(routes::not_found));
}

/// Starts serving on `listener`. The returned [`Server`] runs until it is
/// awaited to completion, stopped through its handle, or sent SIGINT/SIGTERM.
pub fn serve<P: AssetProvider + 'static>(
    listener: TcpListener,
    gateway: Arc<Gateway<P>>,
) -> std::io::Result<Server> {
    let local_addr = listener.local_addr()?;
    let gateway = web::Data::from(gateway);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(cors())
            .app_data(gateway.clone())
            .configure(configure::<P>)
    })
    .listen(listener)?
    .run();

    info!(%local_addr, "Gateway listening");
    Ok(server)
}
