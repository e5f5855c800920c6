//! In-memory model of a captured HTTP archive.
//!
//! An [`Archive`] is built once from validated HAR bytes and never changes
//! afterwards. Reloading means building a new one.

mod exchange;
mod raw;
mod url;

pub use exchange::{BodyEncoding, RecordedExchange};
pub use url::ParsedUrl;

use har_lint::{lint_value, LintOptions};
use raw::RawHar;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const MEMORY_SOURCE: &str = "<memory>";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot read HAR file {source_name}: {reason}")]
    Unreadable { source_name: String, reason: String },

    #[error("HAR file {source_name} failed validation: {}", .issues.join("; "))]
    SchemaInvalid {
        source_name: String,
        issues: Vec<String>,
    },
}

/// Ordered, immutable collection of recorded exchanges.
#[derive(Debug, Clone)]
pub struct Archive {
    source_name: String,
    exchanges: Vec<RecordedExchange>,
}

impl Archive {
    /// Parse and validate HAR bytes held in memory.
    pub fn load(bytes: &[u8]) -> Result<Self, ArchiveError> {
        Self::load_named(bytes, MEMORY_SOURCE)
    }

    /// Read a HAR file from disk and build the model from it.
    pub fn load_file(path: &Path) -> Result<Self, ArchiveError> {
        let source_name = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| ArchiveError::Unreadable {
            source_name: source_name.clone(),
            reason: e.to_string(),
        })?;
        Self::load_named(&bytes, &source_name)
    }

    /// Like [`Archive::load`], with `source_name` used in error messages.
    pub fn load_named(bytes: &[u8], source_name: &str) -> Result<Self, ArchiveError> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ArchiveError::Unreadable {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;

        let lint = lint_value(&value, source_name, &LintOptions::default());
        if lint.has_errors() {
            return Err(ArchiveError::SchemaInvalid {
                source_name: source_name.to_string(),
                issues: lint.errors().map(ToString::to_string).collect(),
            });
        }

        let raw: RawHar = serde_json::from_value(value).map_err(|e| schema_error(source_name, e))?;

        let mut exchanges = Vec::with_capacity(raw.log.entries.len());
        for (idx, entry) in raw.log.entries.into_iter().enumerate() {
            let parsed = ParsedUrl::parse(&entry.request.url).ok_or_else(|| {
                schema_error(
                    source_name,
                    format!("log.entries[{idx}].request.url is not absolute"),
                )
            })?;
            exchanges.push(RecordedExchange::from_raw(entry, parsed));
        }

        debug!(
            "Parsed {} exchanges from {}",
            exchanges.len(),
            source_name
        );

        Ok(Self {
            source_name: source_name.to_string(),
            exchanges,
        })
    }

    /// Where the archive came from (file path or `<memory>`).
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Exchanges in archive order.
    pub fn exchanges(&self) -> &[RecordedExchange] {
        &self.exchanges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordedExchange> {
        self.exchanges.iter()
    }
}

impl<'a> IntoIterator for &'a Archive {
    type Item = &'a RecordedExchange;
    type IntoIter = std::slice::Iter<'a, RecordedExchange>;

    fn into_iter(self) -> Self::IntoIter {
        self.exchanges.iter()
    }
}

fn schema_error(source_name: &str, issue: impl ToString) -> ArchiveError {
    ArchiveError::SchemaInvalid {
        source_name: source_name.to_string(),
        issues: vec![issue.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn har(entries: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "log": {
                "version": "1.2",
                "creator": {"name": "test", "version": "1"},
                "entries": entries
            }
        }))
        .unwrap()
    }

    fn entry(method: &str, url: &str, status: i64, text: &str) -> serde_json::Value {
        json!({
            "request": {"method": method, "url": url, "headers": []},
            "response": {
                "status": status,
                "headers": [
                    {"name": "Content-Type", "value": "text/plain"},
                    {"name": "Set-Cookie", "value": "a=1"},
                    {"name": "Set-Cookie", "value": "b=2"}
                ],
                "content": {"size": text.len(), "text": text}
            }
        })
    }

    #[test]
    fn load_preserves_order_and_fields() {
        let archive = Archive::load(&har(json!([
            entry("GET", "http://Host.test/a?x=1", 200, "hello"),
            entry("POST", "https://host.test:8443/b", 201, "created"),
        ])))
        .unwrap();

        assert_eq!(archive.len(), 2);
        assert!(!archive.is_empty());
        assert_eq!(archive.source_name(), "<memory>");

        let first = &archive.exchanges()[0];
        assert_eq!(first.method(), "GET");
        assert_eq!(first.url(), "http://Host.test/a?x=1");
        assert_eq!(first.url_host(), "host.test");
        assert_eq!(first.url_path(), "/a?x=1");
        assert_eq!(first.response_status(), 200);
        assert_eq!(first.response_body_text(), "hello");
        assert_eq!(first.response_body_encoding(), BodyEncoding::Identity);
        assert_eq!(first.response_content_size(), 5);
        assert_eq!(first.response_headers().len(), 3);
        assert_eq!(first.request_body(), None);

        let second = archive.iter().nth(1).unwrap();
        assert_eq!(second.url_host(), "host.test:8443");
        assert_eq!(second.parsed_url().scheme, "https");
    }

    #[test]
    fn load_reads_post_data_and_encoding() {
        let mut e = entry("POST", "http://a.test/submit", 200, "aGk=");
        e["request"]["postData"] = json!({"mimeType": "text/plain", "text": "X"});
        e["response"]["content"]["encoding"] = json!("base64");

        let archive = Archive::load(&har(json!([e]))).unwrap();
        let exchange = &archive.exchanges()[0];
        assert_eq!(exchange.request_body(), Some("X"));
        assert_eq!(exchange.response_body_encoding(), BodyEncoding::Base64);
    }

    #[test]
    fn missing_text_becomes_empty_string() {
        let mut e = entry("GET", "http://a.test/", 200, "");
        e["response"]["content"] = json!({"size": 120, "mimeType": "text/html"});

        let archive = Archive::load(&har(json!([e]))).unwrap();
        assert_eq!(archive.exchanges()[0].response_body_text(), "");
        assert_eq!(archive.exchanges()[0].response_content_size(), 120);
    }

    #[test]
    fn syntax_error_is_unreadable() {
        let err = Archive::load(b"{ this is not json").unwrap_err();
        assert!(matches!(err, ArchiveError::Unreadable { .. }));
    }

    #[test]
    fn structural_error_is_schema_invalid() {
        let err = Archive::load(br#"{"name": "package.json"}"#).unwrap_err();
        match err {
            ArchiveError::SchemaInvalid { issues, .. } => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].starts_with("E003"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn load_file_names_source_in_errors() {
        let err = Archive::load_file(Path::new("/no/such/capture.har")).unwrap_err();
        assert!(err.to_string().contains("/no/such/capture.har"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            &har(json!([entry("GET", "http://a.test/", 200, "ok")])),
        )
        .unwrap();
        let archive = Archive::load_file(file.path()).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.source_name(), file.path().display().to_string());
    }

    #[test]
    fn two_loads_are_independent() {
        let bytes = har(json!([entry("GET", "http://a.test/", 200, "ok")]));
        let a = Archive::load(&bytes).unwrap();
        let b = Archive::load(&bytes).unwrap();
        assert!(!std::ptr::eq(&a.exchanges()[0], &b.exchanges()[0]));
        assert_eq!(a.exchanges()[0].url(), b.exchanges()[0].url());
    }
}
