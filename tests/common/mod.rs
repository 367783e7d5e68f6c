// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::dev::ServerHandle;
use anyhow::{Context, Result};
use bytes::Bytes;
use gateway_server::{Gateway, GatewayOptions};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use resource_lister::{CloudinaryClient, CloudinaryConfig, ResourceLister};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const CLOUD_NAME: &str = "demo";
pub const API_KEY: &str = "demo-key";
pub const API_SECRET: &str = "demo-secret";
/// `Basic base64("demo-key:demo-secret")`
pub const EXPECTED_AUTHORIZATION: &str = "Basic ZGVtby1rZXk6ZGVtby1zZWNyZXQ=";

/// Scripted answer of the mock Admin API.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with the given status and JSON body.
    Json(StatusCode, Value),
    /// Fill every request up to its `max_results` and hand out a fresh cursor.
    /// Never consumed.
    Endless,
    /// Sleep before answering with an empty page.
    Stall(Duration),
}

/// What the gateway sent to the mock Admin API.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
}

impl RecordedRequest {
    pub fn max_results(&self) -> u32 {
        self.query["max_results"].parse().unwrap()
    }
}

#[derive(Default)]
struct MockState {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A local stand-in for `api.cloudinary.com`.
pub struct MockCloudinary {
    addr: SocketAddr,
    state: Arc<MockState>,
    _handle: JoinHandle<()>,
}

pub fn asset(public_id: &str) -> Value {
    json!({
        "asset_id": format!("id-{public_id}"),
        "public_id": public_id,
        "format": "jpg",
        "version": 1719304854,
        "resource_type": "image",
        "type": "upload",
        "created_at": "2024-06-25T08:40:54Z",
        "bytes": 120253,
        "width": 864,
        "height": 576,
        "url": format!("http://res.cloudinary.com/demo/image/upload/{public_id}.jpg"),
        "secure_url": format!("https://res.cloudinary.com/demo/image/upload/{public_id}.jpg"),
    })
}

/// A page of `count` assets named `{tag}-{i}`.
pub fn page(tag: &str, count: usize, next_cursor: Option<&str>) -> Reply {
    let resources: Vec<Value> = (0..count).map(|i| asset(&format!("{tag}-{i}"))).collect();
    let mut body = json!({ "resources": resources });
    if let Some(cursor) = next_cursor {
        body["next_cursor"] = json!(cursor);
    }
    Reply::Json(StatusCode::OK, body)
}

pub fn api_error(status: StatusCode, message: &str) -> Reply {
    Reply::Json(status, json!({ "error": { "message": message } }))
}

fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

impl MockCloudinary {
    pub async fn start(replies: Vec<Reply>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState {
            replies: Mutex::new(replies.into()),
            requests: Mutex::default(),
        });

        let server_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let state = Arc::clone(&server_state);
                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(Self::answer(&state, req).await) }
                    });
                    if let Err(err) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        eprintln!("Mock Cloudinary connection error: {err:?}");
                    }
                });
            }
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    async fn answer(
        state: &MockState,
        req: Request<hyper::body::Incoming>,
    ) -> Response<Full<Bytes>> {
        let query: HashMap<String, String> = url::form_urlencoded::parse(
            req.uri().query().unwrap_or_default().as_bytes(),
        )
        .into_owned()
        .collect();
        let authorization = req
            .headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let call_number = {
            let mut requests = state.requests.lock().unwrap();
            requests.push(RecordedRequest {
                path: req.uri().path().to_string(),
                query: query.clone(),
                authorization,
            });
            requests.len()
        };

        let reply = {
            let mut replies = state.replies.lock().unwrap();
            match replies.front() {
                Some(Reply::Endless) => Some(Reply::Endless),
                _ => replies.pop_front(),
            }
        };

        match reply {
            Some(Reply::Json(status, body)) => json_response(status, &body),
            Some(Reply::Endless) => {
                let count = query
                    .get("max_results")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(10);
                let cursor = format!("cursor-{call_number}");
                match page(&format!("call{call_number}"), count, Some(&cursor)) {
                    Reply::Json(status, body) => json_response(status, &body),
                    _ => unreachable!(),
                }
            }
            Some(Reply::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                json_response(StatusCode::OK, &json!({ "resources": [] }))
            }
            None => json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &json!({ "error": { "message": "no scripted reply left" } }),
            ),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

/// A gateway served on a random local port, stopped when dropped.
pub struct RunningGateway {
    pub addr: SocketAddr,
    handle: ServerHandle,
}

impl RunningGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        // The stop command is sent eagerly; nothing left to wait for here.
        drop(self.handle.stop(false));
    }
}

pub fn cloudinary_config(base_url: &str) -> CloudinaryConfig {
    CloudinaryConfig::new(CLOUD_NAME, API_KEY, API_SECRET)
        .with_api_base_url(base_url)
        .with_timeout(Duration::from_secs(5))
}

pub async fn start_gateway(
    cloudinary: CloudinaryConfig,
    expose_error_details: bool,
) -> Result<RunningGateway> {
    let client = CloudinaryClient::new(&cloudinary).context("Failed to build Cloudinary client")?;
    let options = GatewayOptions {
        expose_error_details,
        redacted: cloudinary.secrets(),
    };
    let lister = ResourceLister::new(client).with_deadline(Duration::from_secs(30));
    let gateway = Arc::new(Gateway::new(lister, options));

    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let server = gateway_server::serve(listener, gateway)?;
    let handle = server.handle();
    actix_web::rt::spawn(server);

    Ok(RunningGateway { addr, handle })
}
