//! Serde view of the HAR fields the replay engine reads.
//!
//! Only used after the document passed `har-lint`, so required fields are
//! not optional here.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct RawHar {
    pub log: RawHarLog,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawHarLog {
    pub entries: Vec<RawHarEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawHarEntry {
    pub request: RawHarRequest,
    pub response: RawHarResponse,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawHarRequest {
    pub method: String,
    pub url: String,
    #[serde(rename = "postData", default)]
    pub post_data: Option<RawHarPostData>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawHarPostData {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawHarResponse {
    pub status: i64,
    pub headers: Vec<RawHarHeader>,
    pub content: RawHarContent,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawHarHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawHarContent {
    pub size: f64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}
