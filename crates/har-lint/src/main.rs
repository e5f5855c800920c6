//! HAR archive linter CLI
//!
//! Validates HTTP Archive files before they are handed to the replay
//! server.
//!
//! Usage:
//!   har-lint <directory_or_file> [OPTIONS]

use clap::Parser;
use har_lint::{lint_directory, lint_file, LintIssue, LintOptions, LintResult, Severity};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// HAR archive linter
#[derive(Parser, Debug)]
#[command(name = "har-lint")]
#[command(author, version, about = "Validate HAR files before replaying them")]
struct Args {
    /// Path to a HAR file or a directory containing HAR files
    #[arg(required = true)]
    path: PathBuf,

    /// Output format: text (default), json
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Only show errors (hide warnings)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Also report informational findings
    #[arg(short, long)]
    verbose: bool,

    /// Strict mode - treat warnings as errors
    #[arg(short, long)]
    strict: bool,
}

fn main() {
    let args = Args::parse();
    let json_output = args.output == "json";

    let options = LintOptions {
        verbose: args.verbose,
    };
    let result = if args.path.is_dir() {
        lint_directory(&args.path, &options)
    } else {
        lint_file(&args.path, &options)
    };

    if result.files_checked == 0 && result.issues.is_empty() {
        eprintln!(
            "{YELLOW}Warning:{RESET} No .har or .json files found in {}",
            args.path.display()
        );
        std::process::exit(0);
    }

    if !json_output {
        println!("{BOLD}{CYAN}HAR Linter{RESET}");
        println!("{DIM}{RULE}{RESET}");
        println!("{DIM}Scanning:{RESET} {CYAN}{}{RESET}", args.path.display());
        println!(
            "{DIM}Found:{RESET}    {BOLD}{}{RESET} archive file(s)\n",
            result.files_checked
        );
    }

    if json_output {
        print_results_json(&result);
    } else {
        print_results(&result, &args);
    }

    let failed = result.errors > 0 || (args.strict && result.warnings > 0);
    std::process::exit(if failed { 1 } else { 0 });
}

fn print_results_json(result: &LintResult) {
    match serde_json::to_string_pretty(result) {
        Ok(output) => println!("{output}"),
        Err(e) => eprintln!("{RED}Failed to serialize results: {e}{RESET}"),
    }
}

fn print_results(result: &LintResult, args: &Args) {
    if result.issues.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
    } else {
        let mut issues_by_file: BTreeMap<&PathBuf, Vec<&LintIssue>> = BTreeMap::new();
        for issue in &result.issues {
            if args.errors_only && issue.severity != Severity::Error {
                continue;
            }
            issues_by_file.entry(&issue.file).or_default().push(issue);
        }

        for (file, issues) in issues_by_file {
            let file_errors = issues
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .count();
            let file_warnings = issues
                .iter()
                .filter(|i| i.severity == Severity::Warning)
                .count();

            let status = match (file_errors, file_warnings) {
                (0, 0) => format!("{CYAN}INFO{RESET}"),
                (0, _) => format!("{YELLOW}WARN{RESET}"),
                _ => format!("{RED}FAIL{RESET}"),
            };
            let file_name = file.file_name().unwrap_or_default().to_string_lossy();
            println!(
                "{status} {BOLD}{CYAN}{file_name}{RESET} {DIM}({file_errors} error(s), {file_warnings} warning(s)){RESET}"
            );

            for issue in issues {
                let color = severity_color(issue.severity);
                let location = issue
                    .location
                    .as_ref()
                    .map(|l| format!("{DIM}[{RESET}{CYAN}{l}{RESET}{DIM}]{RESET} "))
                    .unwrap_or_default();

                println!(
                    "  {color}|{RESET} {location}{BOLD}{color}{}{RESET}: {} {DIM}({color}{}{DIM}){RESET}",
                    issue.severity.label(),
                    issue.message,
                    issue.code
                );
                if let Some(suggestion) = &issue.suggestion {
                    println!("  {color}|{RESET}   {GREEN}-> {suggestion}{RESET}");
                }
            }
            println!();
        }
    }

    println!("{DIM}{RULE}{RESET}");
    println!("{BOLD}{CYAN}Summary{RESET}");
    println!("{DIM}{RULE}{RESET}");
    println!(
        "  {DIM}Files checked:{RESET} {BOLD}{}{RESET}",
        result.files_checked
    );
    let error_color = if result.errors > 0 { RED } else { GREEN };
    println!(
        "  {error_color}Errors:{RESET}    {BOLD}{error_color}{}{RESET}",
        result.errors
    );
    let warning_color = if result.warnings > 0 { YELLOW } else { DIM };
    println!(
        "  {warning_color}Warnings:{RESET}  {BOLD}{}{RESET}",
        result.warnings
    );
    println!();

    if result.errors == 0 && result.warnings == 0 {
        println!("{GREEN}{BOLD}All checks passed!{RESET}");
    } else if result.errors == 0 {
        println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
    } else {
        println!("{RED}{BOLD}Linting failed with errors{RESET}");
    }
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    }
}
