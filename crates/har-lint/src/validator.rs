//! Core validation logic for HAR documents.
//!
//! Only the parts of the HAR 1.2 schema a replay server depends on are
//! enforced as errors. Everything else is at most a warning.

use crate::types::{LintIssue, LintOptions, LintResult};
use regex::Regex;
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;

const KNOWN_ENCODINGS: [&str; 2] = ["base64", "identity"];

fn token_re() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"^[!#$%&'*+\-.^_`|~0-9A-Za-z]+$").expect("token regex"))
}

fn absolute_url_re() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| Regex::new(r"(?i)^https?://[^/\s?#]+").expect("url regex"))
}

/// Validate a complete HAR document.
pub fn validate_har(file: &Path, har: &Value, result: &mut LintResult, options: &LintOptions) {
    let Some(root) = har.as_object() else {
        result.add_issue(
            LintIssue::error("E003", "HAR document must be a JSON object", file.to_path_buf())
                .with_suggestion("Wrap the archive in { \"log\": { ... } }"),
        );
        return;
    };

    let Some(log) = root.get("log") else {
        result.add_issue(
            LintIssue::error("E003", "Missing required field: log", file.to_path_buf())
                .with_suggestion("Add a top-level \"log\" object"),
        );
        return;
    };

    validate_log(file, log, result, options);
}

/// Validate the `log` object and every entry inside it.
pub fn validate_log(file: &Path, log: &Value, result: &mut LintResult, options: &LintOptions) {
    if !log.is_object() {
        result.add_issue(
            LintIssue::error("E004", "log must be an object", file.to_path_buf())
                .with_location("log"),
        );
        return;
    }

    for field in ["version", "creator"] {
        if log.get(field).is_none() {
            result.add_issue(
                LintIssue::warning(
                    "W001",
                    format!("log is missing '{field}'"),
                    file.to_path_buf(),
                )
                .with_location("log"),
            );
        }
    }

    let Some(entries) = log.get("entries").and_then(Value::as_array) else {
        result.add_issue(
            LintIssue::error("E005", "log.entries must be an array", file.to_path_buf())
                .with_location("log.entries"),
        );
        return;
    };

    if entries.is_empty() {
        result.add_issue(
            LintIssue::warning("W004", "Archive contains no entries", file.to_path_buf())
                .with_location("log.entries")
                .with_suggestion("Every request will be answered with 404"),
        );
    }

    for (idx, entry) in entries.iter().enumerate() {
        validate_entry(file, entry, &format!("log.entries[{idx}]"), result, options);
    }
}

/// Validate a single entry.
pub fn validate_entry(
    file: &Path,
    entry: &Value,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    if !entry.is_object() {
        result.add_issue(
            LintIssue::error("E006", "Entry must be an object", file.to_path_buf())
                .with_location(location),
        );
        return;
    }

    match entry.get("request") {
        Some(request) if request.is_object() => {
            validate_request(file, request, &format!("{location}.request"), result);
        }
        _ => result.add_issue(
            LintIssue::error(
                "E007",
                "Entry is missing a 'request' object",
                file.to_path_buf(),
            )
            .with_location(location),
        ),
    }

    match entry.get("response") {
        Some(response) if response.is_object() => {
            validate_response(
                file,
                response,
                &format!("{location}.response"),
                result,
                options,
            );
        }
        _ => result.add_issue(
            LintIssue::error(
                "E008",
                "Entry is missing a 'response' object",
                file.to_path_buf(),
            )
            .with_location(location),
        ),
    }
}

/// Validate the request half of an entry.
pub fn validate_request(file: &Path, request: &Value, location: &str, result: &mut LintResult) {
    match request.get("method").and_then(Value::as_str) {
        None => result.add_issue(
            LintIssue::error(
                "E009",
                "request.method must be a string",
                file.to_path_buf(),
            )
            .with_location(format!("{location}.method")),
        ),
        Some(method) if !token_re().is_match(method) => result.add_issue(
            LintIssue::error(
                "E010",
                format!("request.method is not a valid HTTP method token: {method:?}"),
                file.to_path_buf(),
            )
            .with_location(format!("{location}.method")),
        ),
        Some(_) => {}
    }

    match request.get("url").and_then(Value::as_str) {
        None => result.add_issue(
            LintIssue::error("E011", "request.url must be a string", file.to_path_buf())
                .with_location(format!("{location}.url")),
        ),
        Some(url) if !absolute_url_re().is_match(url) => result.add_issue(
            LintIssue::error(
                "E012",
                format!("request.url must be an absolute http(s) URL: {url}"),
                file.to_path_buf(),
            )
            .with_location(format!("{location}.url"))
            .with_suggestion("Use the full URL as captured, e.g. https://example.com/path"),
        ),
        Some(_) => {}
    }

    if let Some(post_data) = request.get("postData").filter(|v| !v.is_null()) {
        if let Some(text) = post_data.get("text") {
            if !text.is_string() && !text.is_null() {
                result.add_issue(
                    LintIssue::error(
                        "E013",
                        "request.postData.text must be a string",
                        file.to_path_buf(),
                    )
                    .with_location(format!("{location}.postData.text")),
                );
            }
        }
    }
}

/// Validate the response half of an entry.
pub fn validate_response(
    file: &Path,
    response: &Value,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    match response.get("status").and_then(Value::as_i64) {
        None => result.add_issue(
            LintIssue::error(
                "E014",
                "response.status must be an integer",
                file.to_path_buf(),
            )
            .with_location(format!("{location}.status")),
        ),
        Some(status) if !(0..=599).contains(&status) => result.add_issue(
            LintIssue::error(
                "E015",
                format!("Invalid HTTP status code: {status}"),
                file.to_path_buf(),
            )
            .with_location(format!("{location}.status"))
            .with_suggestion("Use a valid HTTP status code (100-599)"),
        ),
        Some(_) => {}
    }

    match response.get("headers") {
        Some(headers) => {
            validate_headers(file, headers, &format!("{location}.headers"), result, options)
        }
        None => result.add_issue(
            LintIssue::error(
                "E016",
                "response.headers must be an array",
                file.to_path_buf(),
            )
            .with_location(format!("{location}.headers")),
        ),
    }

    match response.get("content") {
        Some(content) if content.is_object() => {
            validate_content(file, content, &format!("{location}.content"), result);
        }
        _ => result.add_issue(
            LintIssue::error(
                "E019",
                "response.content must be an object",
                file.to_path_buf(),
            )
            .with_location(format!("{location}.content")),
        ),
    }
}

/// Validate a `headers` array of name/value pairs.
pub fn validate_headers(
    file: &Path,
    headers: &Value,
    location: &str,
    result: &mut LintResult,
    options: &LintOptions,
) {
    let Some(list) = headers.as_array() else {
        result.add_issue(
            LintIssue::error("E016", "headers must be an array", file.to_path_buf())
                .with_location(location)
                .with_suggestion("Use [{\"name\": \"...\", \"value\": \"...\"}]"),
        );
        return;
    };

    for (idx, header) in list.iter().enumerate() {
        let header_location = format!("{location}[{idx}]");
        if !header.is_object() {
            result.add_issue(
                LintIssue::error("E017", "Header must be an object", file.to_path_buf())
                    .with_location(header_location),
            );
            continue;
        }

        let name = header.get("name").and_then(Value::as_str);
        let value = header.get("value").and_then(Value::as_str);
        match (name, value) {
            (Some(name), Some(_)) if !name.is_empty() => {
                let lower = name.to_ascii_lowercase();
                if options.verbose && (lower == "content-length" || lower == "content-encoding") {
                    result.add_issue(
                        LintIssue::info(
                            "I001",
                            format!("Header '{name}' is dropped when the response is replayed"),
                            file.to_path_buf(),
                        )
                        .with_location(header_location),
                    );
                }
            }
            _ => result.add_issue(
                LintIssue::error(
                    "E018",
                    "Header requires a non-empty string 'name' and a string 'value'",
                    file.to_path_buf(),
                )
                .with_location(header_location),
            ),
        }
    }
}

/// Validate `response.content`.
pub fn validate_content(file: &Path, content: &Value, location: &str, result: &mut LintResult) {
    let size = content.get("size");
    if !size.map(Value::is_number).unwrap_or(false) {
        result.add_issue(
            LintIssue::error(
                "E020",
                "content.size must be a number",
                file.to_path_buf(),
            )
            .with_location(format!("{location}.size")),
        );
    }

    let text = content.get("text").filter(|v| !v.is_null());
    if let Some(text) = text {
        if !text.is_string() {
            result.add_issue(
                LintIssue::error(
                    "E021",
                    "content.text must be a string",
                    file.to_path_buf(),
                )
                .with_location(format!("{location}.text")),
            );
        }
    }

    if let Some(encoding) = content.get("encoding").filter(|v| !v.is_null()) {
        match encoding.as_str() {
            None => result.add_issue(
                LintIssue::error(
                    "E022",
                    "content.encoding must be a string",
                    file.to_path_buf(),
                )
                .with_location(format!("{location}.encoding")),
            ),
            Some(name) if !KNOWN_ENCODINGS.contains(&name) => result.add_issue(
                LintIssue::warning(
                    "W002",
                    format!("Unknown content encoding '{name}', body will be replayed as text"),
                    file.to_path_buf(),
                )
                .with_location(format!("{location}.encoding")),
            ),
            Some(_) => {}
        }
    }

    let declared = size.and_then(Value::as_i64).unwrap_or(0);
    let text_empty = text.and_then(Value::as_str).map(str::is_empty).unwrap_or(true);
    if declared > 0 && text_empty {
        result.add_issue(
            LintIssue::warning(
                "W003",
                format!("content.size is {declared} but no body text was captured"),
                file.to_path_buf(),
            )
            .with_location(location)
            .with_suggestion("Re-export the archive with response bodies included"),
        );
    }
}
