//! Request-to-exchange matching.
//!
//! A linear scan in archive order; the first exchange satisfying every
//! condition wins. There is no scoring and no partial match.

use crate::archive::{Archive, RecordedExchange};
pub use crate::config::MatchOptions;
use bytes::Bytes;

/// What the matcher needs to know about a live request.
#[derive(Debug, Clone, Default)]
pub struct LiveRequest {
    pub method: String,
    /// Request target path including the query string.
    pub path: String,
    /// `Host` header value, empty when the client sent none.
    pub host: String,
    pub body: Option<Bytes>,
}

impl LiveRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            host: host.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    fn body_bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }
}

/// Find the first recorded exchange that answers `request`.
pub fn find_match<'a>(
    request: &LiveRequest,
    archive: &'a Archive,
    options: &MatchOptions,
) -> Option<&'a RecordedExchange> {
    archive
        .iter()
        .find(|exchange| matches_exchange(request, exchange, options))
}

/// Whether `exchange` satisfies all match conditions for `request`.
pub fn matches_exchange(
    request: &LiveRequest,
    exchange: &RecordedExchange,
    options: &MatchOptions,
) -> bool {
    if request.method != exchange.method() || request.path != exchange.url_path() {
        return false;
    }

    if !options.ignore_host_header && request.host != exchange.url_host() {
        return false;
    }

    match exchange.request_body() {
        Some(recorded) => recorded.as_bytes() == request.body_bytes(),
        None => true,
    }
}
