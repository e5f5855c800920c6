//! Structural validation for HTTP Archive (HAR) files.
//!
//! The replay server refuses archives that fail these checks, and the
//! `har-lint` binary reports them ahead of time.
//!
//! # Example
//!
//! ```no_run
//! use har_lint::{lint_file, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_file(Path::new("capture.har"), &LintOptions::default());
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

mod types;
mod validator;

use std::path::Path;

pub use types::{LintIssue, LintOptions, LintResult, Severity};

pub use validator::{
    validate_content, validate_entry, validate_har, validate_headers, validate_log,
    validate_request, validate_response,
};

/// File extensions picked up by [`lint_directory`].
pub const ARCHIVE_EXTENSIONS: [&str; 2] = ["har", "json"];

/// Lint a single archive on disk.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    let content = match std::fs::read(path) {
        Ok(c) => c,
        Err(e) => {
            let mut result = LintResult::new();
            result.files_checked = 1;
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read file: {e}"),
                path.to_path_buf(),
            ));
            return result;
        }
    };

    lint_bytes(&content, &path.to_string_lossy(), options)
}

/// Lint every archive in a directory (non-recursive).
pub fn lint_directory(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let entries = match std::fs::read_dir(path) {
        Ok(e) => e,
        Err(e) => {
            result.add_issue(LintIssue::error(
                "E001",
                format!("Failed to read directory: {e}"),
                path.to_path_buf(),
            ));
            return result;
        }
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && is_archive_path(p))
        .collect();
    files.sort();

    for file in files {
        result.merge(lint_file(&file, options));
    }

    result
}

/// Whether a path carries one of the [`ARCHIVE_EXTENSIONS`].
pub fn is_archive_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ARCHIVE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Lint raw archive bytes. A leading UTF-8 byte order mark is ignored.
pub fn lint_bytes(bytes: &[u8], source_name: &str, options: &LintOptions) -> LintResult {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => lint_value(&value, source_name, options),
        Err(e) => {
            let mut result = LintResult::new();
            result.files_checked = 1;
            result.add_issue(
                LintIssue::error(
                    "E002",
                    format!("Invalid JSON: {e}"),
                    Path::new(source_name).to_path_buf(),
                )
                .with_suggestion("Check for JSON syntax errors"),
            );
            result
        }
    }
}

/// Lint a JSON string directly.
pub fn lint_json(json: &str, source_name: &str, options: &LintOptions) -> LintResult {
    lint_bytes(json.as_bytes(), source_name, options)
}

/// Lint an already parsed JSON value.
pub fn lint_value(
    value: &serde_json::Value,
    source_name: &str,
    options: &LintOptions,
) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;
    validate_har(Path::new(source_name), value, &mut result, options);
    result
}
