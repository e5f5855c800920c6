//! Turns a recorded exchange back into response bytes.

mod builder;

pub use builder::ErrorResponseBuilder;

use crate::archive::{BodyEncoding, RecordedExchange};
use base64::Engine;
use bytes::Bytes;
use http_body_util::Full;
use hyper::http::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Recorded headers that are never replayed. The body is served decoded
/// and re-framed by the server, so the captured values would be wrong.
const DROPPED_HEADERS: [&str; 2] = ["content-encoding", "content-length"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    /// The archive says a body existed but did not store it.
    #[error("archived response declares a body but none was captured")]
    EmptyBody,

    #[error("archived status {0} is not a valid HTTP status code")]
    InvalidStatus(i64),

    #[error("archived base64 body does not decode: {0}")]
    InvalidBase64(String),
}

/// Status, headers and body ready to be written to a connection.
#[derive(Debug, Clone)]
pub struct ReplayResponse {
    pub status: StatusCode,
    /// In archive order, duplicates kept.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ReplayResponse {
    /// Convert into a hyper response. Headers hyper cannot represent are
    /// skipped.
    pub fn into_http(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => debug!("Skipping unrepresentable archived header {:?}", name),
            }
        }
        response
    }
}

/// Whether a recorded header is dropped on replay.
pub fn is_dropped_header(name: &str) -> bool {
    DROPPED_HEADERS
        .iter()
        .any(|dropped| name.eq_ignore_ascii_case(dropped))
}

/// Build the replayed response for a matched exchange.
pub fn build(exchange: &RecordedExchange) -> Result<ReplayResponse, ReplayError> {
    let text = exchange.response_body_text();
    if text.is_empty() && exchange.response_content_size() > 0 {
        return Err(ReplayError::EmptyBody);
    }

    let status = u16::try_from(exchange.response_status())
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or(ReplayError::InvalidStatus(exchange.response_status()))?;

    let headers = exchange
        .response_headers()
        .iter()
        .filter(|(name, _)| !is_dropped_header(name))
        .cloned()
        .collect();

    let body = match exchange.response_body_encoding() {
        BodyEncoding::Identity => Bytes::copy_from_slice(text.as_bytes()),
        BodyEncoding::Base64 => base64::engine::general_purpose::STANDARD
            .decode(text)
            .map(Bytes::from)
            .map_err(|e| ReplayError::InvalidBase64(e.to_string()))?,
    };

    Ok(ReplayResponse {
        status,
        headers,
        body,
    })
}
