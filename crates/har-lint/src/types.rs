//! Findings produced while checking a HAR document.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// How much a finding matters for replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The archive is refused by the replay server.
    Error,
    /// The archive loads, but some entries will replay badly or not at all.
    Warning,
    Info,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// One problem in one archive.
///
/// `location` is a dotted path into the HAR document such as
/// `log.entries[3].response.status`; it is absent for problems with the
/// file as a whole (unreadable, not JSON).
#[derive(Debug, Clone, Serialize)]
pub struct LintIssue {
    pub severity: Severity,
    /// Rule identifier: `E…` for errors, `W…` for warnings, `I…` for notes.
    pub code: String,
    pub message: String,
    /// Archive path, or the source name given for in-memory input.
    #[serde(serialize_with = "path_as_str")]
    pub file: PathBuf,
    pub location: Option<String>,
    /// How to repair the capture, when there is an obvious fix.
    pub suggestion: Option<String>,
}

fn path_as_str<S>(path: &Path, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&path.to_string_lossy())
}

impl LintIssue {
    fn new(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        file: PathBuf,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            file,
            location: None,
            suggestion: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self::new(Severity::Error, code, message, file)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self::new(Severity::Warning, code, message, file)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>, file: PathBuf) -> Self {
        Self::new(Severity::Info, code, message, file)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

/// `CODE [location]: message`, the form the replay server puts in its
/// schema errors.
impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} [{location}]: {}", self.code, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

/// Findings for one archive, or several merged together.
///
/// `errors` and `warnings` are kept in step with `issues` by
/// [`add_issue`](Self::add_issue) and [`merge`](Self::merge).
#[derive(Debug, Default, Serialize)]
pub struct LintResult {
    pub issues: Vec<LintIssue>,
    pub files_checked: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl LintResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, issue: LintIssue) {
        match issue.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => {}
        }
        self.issues.push(issue);
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// True when the replay server would accept the archive.
    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// Error-severity findings, in the order they were found.
    pub fn errors(&self) -> impl Iterator<Item = &LintIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn merge(&mut self, other: LintResult) {
        self.issues.extend(other.issues);
        self.files_checked += other.files_checked;
        self.errors += other.errors;
        self.warnings += other.warnings;
    }
}

#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    /// Also emit `I…` notes (headers the replay server rewrites).
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_severity() {
        let mut result = LintResult::new();
        result.add_issue(LintIssue::error("E001", "boom", PathBuf::from("a.har")));
        result.add_issue(LintIssue::warning("W001", "hmm", PathBuf::from("a.har")));
        result.add_issue(LintIssue::info("I001", "fyi", PathBuf::from("a.har")));

        assert_eq!(result.errors, 1);
        assert_eq!(result.warnings, 1);
        assert_eq!(result.issues.len(), 3);
        assert!(!result.is_valid());
        assert_eq!(result.errors().count(), 1);
    }

    #[test]
    fn merge_adds_counts_and_files() {
        let mut total = LintResult::new();
        let mut one = LintResult::new();
        one.files_checked = 1;
        one.add_issue(LintIssue::warning("W004", "empty", PathBuf::from("a.har")));
        let mut two = LintResult::new();
        two.files_checked = 1;
        two.add_issue(LintIssue::error("E014", "bad", PathBuf::from("b.har")));

        total.merge(one);
        total.merge(two);
        assert_eq!(total.files_checked, 2);
        assert_eq!((total.errors, total.warnings), (1, 1));
        assert_eq!(total.errors().next().map(|i| i.code.as_str()), Some("E014"));
    }

    #[test]
    fn display_includes_location() {
        let issue = LintIssue::error("E014", "bad status", PathBuf::from("a.har"))
            .with_location("log.entries[0].response.status");
        assert_eq!(
            issue.to_string(),
            "E014 [log.entries[0].response.status]: bad status"
        );
    }
}
