use super::raw::RawHarEntry;
use super::url::ParsedUrl;

/// How `response.content.text` is stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Identity,
    Base64,
}

impl BodyEncoding {
    fn from_har(encoding: Option<&str>) -> Self {
        match encoding {
            Some("base64") => BodyEncoding::Base64,
            _ => BodyEncoding::Identity,
        }
    }
}

/// One request/response pair from the archive. Immutable once built.
#[derive(Debug, Clone)]
pub struct RecordedExchange {
    method: String,
    url: String,
    parsed_url: ParsedUrl,
    request_body: Option<String>,
    response_status: i64,
    response_headers: Vec<(String, String)>,
    response_body_text: String,
    response_body_encoding: BodyEncoding,
    response_content_size: i64,
}

impl RecordedExchange {
    pub(super) fn from_raw(entry: RawHarEntry, parsed_url: ParsedUrl) -> Self {
        let request_body = entry
            .request
            .post_data
            .and_then(|p| p.text)
            .filter(|text| !text.is_empty());
        let content = entry.response.content;

        Self {
            method: entry.request.method,
            url: entry.request.url,
            parsed_url,
            request_body,
            response_status: entry.response.status,
            response_headers: entry
                .response
                .headers
                .into_iter()
                .map(|h| (h.name, h.value))
                .collect(),
            response_body_encoding: BodyEncoding::from_har(content.encoding.as_deref()),
            response_body_text: content.text.unwrap_or_default(),
            response_content_size: content.size as i64,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The URL as captured.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn parsed_url(&self) -> &ParsedUrl {
        &self.parsed_url
    }

    /// `hostname[:port]` as captured.
    pub fn url_host(&self) -> &str {
        &self.parsed_url.host
    }

    /// Path plus query string as captured.
    pub fn url_path(&self) -> &str {
        &self.parsed_url.path
    }

    /// Request body, only when the archive recorded a non-empty one.
    pub fn request_body(&self) -> Option<&str> {
        self.request_body.as_deref()
    }

    pub fn response_status(&self) -> i64 {
        self.response_status
    }

    pub fn response_headers(&self) -> &[(String, String)] {
        &self.response_headers
    }

    pub fn response_body_text(&self) -> &str {
        &self.response_body_text
    }

    pub fn response_body_encoding(&self) -> BodyEncoding {
        self.response_body_encoding
    }

    pub fn response_content_size(&self) -> i64 {
        self.response_content_size
    }
}
