mod checks;
mod docx;
mod redlining;
mod xsd;

pub use checks::{IdScope, PackageChecker};
pub use docx::{DocxValidator, ValidationOutcome};
pub use redlining::{RedliningOutcome, RedliningValidator};
pub use xsd::XsdChecker;

use serde::Serialize;
use std::fmt;

/// One constraint violation, with enough context to locate and fix it.
#[derive(Clone, Debug, Serialize)]
pub struct Violation {
    pub file: String,
    pub line: Option<u32>,
    pub message: String,
}

impl Violation {
    pub fn new(file: impl Into<String>, line: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}: Line {}: {}", self.file, line, self.message),
            None => write!(f, "{}: {}", self.file, self.message),
        }
    }
}

/// Outcome of one independent check.
///
/// The printed form is a contract relied on by callers that scrape
/// pass/fail state: `PASSED - <description>` or
/// `FAILED - <N> violation(s)` followed by indented detail lines.
#[derive(Clone, Debug, Serialize)]
pub struct CheckReport {
    pub description: String,
    pub violations: Vec<Violation>,
    pub skipped: bool,
}

impl CheckReport {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            violations: Vec::new(),
            skipped: false,
        }
    }

    pub fn skipped(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            violations: Vec::new(),
            skipped: true,
        }
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Print per the diagnostic contract. Passing and skipped checks are
    /// only shown in verbose mode; failures always print.
    pub fn print(&self, verbose: bool) {
        if self.skipped {
            if verbose {
                println!("SKIPPED - {}", self.description);
            }
            return;
        }
        if self.violations.is_empty() {
            if verbose {
                println!("PASSED - {}", self.description);
            }
        } else {
            println!("FAILED - {} violation(s)", self.violations.len());
            for violation in &self.violations {
                println!("  {}", violation);
            }
        }
    }

    /// Multi-line rendering used when aggregating failures into an error.
    pub fn render_failure(&self) -> String {
        let mut out = format!(
            "{}: {} violation(s)",
            self.description,
            self.violations.len()
        );
        for violation in &self.violations {
            out.push_str("\n  ");
            out.push_str(&violation.to_string());
        }
        out
    }
}
