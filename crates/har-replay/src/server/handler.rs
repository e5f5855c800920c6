//! HTTP request handling for replay listeners.

use crate::archive::Archive;
use crate::logging::ReplayLog;
use crate::matcher::{find_match, LiveRequest, MatchOptions};
use crate::response::{self, ErrorResponseBuilder, ReplayError};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::HOST;
use hyper::{Request, Response};
use std::convert::Infallible;
use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

/// Everything a listener needs to answer requests. Shared read-only by all
/// connections of every listener started together.
pub struct ReplayEngine {
    archive: Arc<Archive>,
    options: MatchOptions,
    log: Arc<dyn ReplayLog>,
}

impl ReplayEngine {
    pub fn new(archive: Arc<Archive>, options: MatchOptions, log: Arc<dyn ReplayLog>) -> Self {
        Self {
            archive,
            options,
            log,
        }
    }

    pub fn archive(&self) -> &Arc<Archive> {
        &self.archive
    }

    /// Match `request` and produce the response to send.
    pub fn respond(&self, request: &LiveRequest) -> Response<Full<Bytes>> {
        let LiveRequest {
            method, path, host, ..
        } = request;

        let Some(exchange) = find_match(request, &self.archive, &self.options) else {
            self.log
                .error(&format!("{method} (404) {host} {path} (Not in HAR file)"));
            return ErrorResponseBuilder::not_found(format!(
                "Cannot find HAR file entry for a {method} to {path}"
            ))
            .build();
        };

        match response::build(exchange) {
            Ok(replayed) => {
                self.log.info(&format!(
                    "{method} ({}) {host} {path}",
                    replayed.status.as_u16()
                ));
                replayed.into_http()
            }
            Err(ReplayError::EmptyBody) => {
                self.log.error(&format!(
                    "{method} (404) {host} {path} (No response body in HAR file)"
                ));
                ErrorResponseBuilder::not_found(format!(
                    "No response body in HAR file for a {method} request to {path}"
                ))
                .build()
            }
            Err(e) => {
                self.log
                    .error(&format!("{method} (500) {host} {path} ({e})"));
                ErrorResponseBuilder::internal_error(format!(
                    "Cannot replay HAR file entry for a {method} to {path}: {e}"
                ))
                .build()
            }
        }
    }

    /// Answer a request whose body could not be read in full. It is never
    /// matched, since a truncated body could match an entry by accident.
    pub fn reject_unreadable(&self, unreadable: &UnreadableBody) -> Response<Full<Bytes>> {
        let LiveRequest {
            method, path, host, ..
        } = &unreadable.request;
        self.log.error(&format!(
            "{method} (400) {host} {path} (Unreadable request body: {})",
            unreadable.reason
        ));
        ErrorResponseBuilder::bad_request(format!(
            "Cannot read the request body of a {method} to {path}"
        ))
        .build()
    }
}

/// A request whose body failed mid-read. `request` carries no body.
#[derive(Debug)]
pub struct UnreadableBody {
    pub request: LiveRequest,
    pub reason: String,
}

/// Handle one HTTP request on a replay listener.
pub async fn handle_replay_request<B>(
    req: Request<B>,
    engine: Arc<ReplayEngine>,
    client_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Display,
{
    let response = match live_request(req, client_addr).await {
        Ok(live) => engine.respond(&live),
        Err(unreadable) => engine.reject_unreadable(&unreadable),
    };
    Ok(response)
}

/// Extract the matcher's view of a request, consuming the body.
pub async fn live_request<B>(
    req: Request<B>,
    client_addr: SocketAddr,
) -> Result<LiveRequest, UnreadableBody>
where
    B: Body,
    B::Error: Display,
{
    let method = req.method().as_str().to_string();
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .filter(|pq| !pq.is_empty())
        .unwrap_or_else(|| "/".to_string());
    let host = req
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))
        .unwrap_or_default();

    let request = LiveRequest::new(method, path, host);
    match req.into_body().collect().await {
        Ok(collected) => Ok(request.with_body(collected.to_bytes())),
        Err(e) => {
            debug!("Failed to read request body from {}: {}", client_addr, e);
            Err(UnreadableBody {
                request,
                reason: e.to_string(),
            })
        }
    }
}
