//! Host collaborator boundary.
//!
//! The host supplies confirmation prompts and receives emitted packages
//! and error records. The CLI uses [`ConsoleHost`]; tests use the
//! generated `MockHost`.

use std::fmt;
use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::provider::PackageInfo;

/// Decision returned from the untrusted-source prompt.
///
/// "To all" answers are folded into the request's sticky state by the
/// caller; the host only reports what the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
    Yes,
    No,
    YesToAll,
    NoToAll,
}

/// Category attached to an error record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NotSpecified,
    ObjectNotFound,
    InvalidArgument,
}

/// Non-fatal error surfaced to the host.
///
/// Always attributed to the originally requested target name, not a
/// resolved identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub code: &'static str,
    pub category: ErrorCategory,
    pub target: String,
    pub message: String,
}

impl ErrorRecord {
    pub const PROVIDER_ERROR: &'static str = "PackageProviderError";
    pub const NOT_FOUND: &'static str = "PackageNotFound";

    /// A provider raised an error while handling a request.
    pub fn provider_error(target: &str, error: &anyhow::Error) -> Self {
        Self {
            code: Self::PROVIDER_ERROR,
            category: ErrorCategory::NotSpecified,
            target: target.to_string(),
            message: format!("{error:#}"),
        }
    }

    /// No candidate provider produced a result for the target.
    pub fn not_found(target: &str) -> Self {
        Self {
            code: Self::NOT_FOUND,
            category: ErrorCategory::ObjectNotFound,
            target: target.to_string(),
            message: format!("No package found for '{target}'."),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} (target: '{}')", self.code, self.message, self.target)
    }
}

/// Raised when the caller has requested that the whole command stop.
///
/// The dispatch loop re-raises it unchanged; wrapping it would turn a
/// fatal stop into a per-target provider error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Canceled;

impl fmt::Display for Canceled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation canceled by the caller")
    }
}

impl std::error::Error for Canceled {}

/// Sink and prompt surface supplied by the invoking command.
#[cfg_attr(test, mockall::automock)]
pub trait Host: Send {
    /// Emit a package object to the caller.
    fn write_package(&mut self, package: PackageInfo);

    /// Report a non-fatal error record.
    fn write_error(&mut self, record: ErrorRecord);

    /// Confirm a side-effecting action before any provider runs.
    /// Declining skips the target with no error.
    fn should_process(&mut self, action: &str, target: &str) -> bool;

    /// Ask the user whether to proceed, with sticky "to all" options.
    fn prompt_for_choice(
        &mut self,
        caption: &str,
        query: &str,
        has_security_impact: bool,
    ) -> Result<PromptChoice>;
}

/// Interactive host over stdin/stdout/stderr.
pub struct ConsoleHost {
    assume_yes: bool,
    error_count: usize,
}

impl ConsoleHost {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            error_count: 0,
        }
    }

    /// How many error records have been reported so far.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    fn read_line(&self) -> Option<String> {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_lowercase()),
        }
    }
}

impl Host for ConsoleHost {
    fn write_package(&mut self, package: PackageInfo) {
        println!("{package}");
    }

    fn write_error(&mut self, record: ErrorRecord) {
        self.error_count += 1;
        eprintln!("{record}");
    }

    fn should_process(&mut self, action: &str, target: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{action} '{target}'? [Y/n] ");
        let _ = io::stdout().flush();

        match self.read_line() {
            Some(answer) => answer.is_empty() || answer == "y" || answer == "yes",
            None => false,
        }
    }

    fn prompt_for_choice(
        &mut self,
        caption: &str,
        query: &str,
        has_security_impact: bool,
    ) -> Result<PromptChoice> {
        println!("{caption}");
        if has_security_impact {
            println!("Warning: this action has a security impact.");
        }
        println!("{query}");

        loop {
            print!("[Y] Yes  [A] Yes to All  [N] No  [L] No to All: ");
            let _ = io::stdout().flush();

            // EOF means the caller is gone; stop the whole command.
            let Some(answer) = self.read_line() else {
                return Err(Canceled.into());
            };

            match answer.as_str() {
                "y" | "yes" => return Ok(PromptChoice::Yes),
                "a" => return Ok(PromptChoice::YesToAll),
                "n" | "no" => return Ok(PromptChoice::No),
                "l" => return Ok(PromptChoice::NoToAll),
                _ => println!("Unrecognized answer '{answer}'."),
            }
        }
    }
}
