//! Classification of `go doc` failures.
//!
//! The extractor's output is opaque text, so the only thing we do with it on
//! failure is look for a handful of well-known substrings and attach a hint
//! that tells the caller how to rephrase the query. New cases are new rows in
//! [`RULES`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    PackageNotFound,
    SymbolNotFound,
    BuildConstraints,
    Other,
}

struct Rule {
    kind: FailureKind,
    needles: &'static [&'static str],
    hint: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        kind: FailureKind::PackageNotFound,
        needles: &["no such package", "is not in std"],
        hint: "package not found:\n\
               1. For standard library packages, use just the package name (e.g., 'io', 'net/http')\n\
               2. For external packages, ensure they are imported in the module\n\
               3. For local packages, provide a relative path (e.g., './pkg') or absolute path\n\
               4. Check for typos in the package name",
    },
    Rule {
        kind: FailureKind::SymbolNotFound,
        needles: &["no such symbol"],
        hint: "symbol not found:\n\
               1. Check if the symbol name is correct (case-sensitive)\n\
               2. Use -u flag to see unexported symbols\n\
               3. Use -all flag to see all package documentation",
    },
    Rule {
        kind: FailureKind::BuildConstraints,
        needles: &["build constraints exclude all Go files"],
        hint: "no Go files for current platform; try -all flag or set GOOS/GOARCH",
    },
];

/// A failed extractor run, classified by its captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionFailure {
    pub kind: FailureKind,
    /// Exit status as reported by the OS, e.g. `exit status: 1`.
    pub status: String,
    pub output: String,
}

impl ExtractionFailure {
    pub fn classify(status: impl Into<String>, output: impl Into<String>) -> Self {
        let output = output.into();
        let kind = rule_for(&output).map_or(FailureKind::Other, |rule| rule.kind);
        Self {
            kind,
            status: status.into(),
            output,
        }
    }

    /// Remediation text for the classified kind, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        RULES
            .iter()
            .find(|rule| rule.kind == self.kind)
            .map(|rule| rule.hint)
    }
}

fn rule_for(output: &str) -> Option<&'static Rule> {
    RULES
        .iter()
        .find(|rule| rule.needles.iter().any(|needle| output.contains(needle)))
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hint() {
            Some(hint) => write!(f, "{hint}\nDetail ({}): {}", self.status, self.output.trim_end()),
            None => write!(f, "go doc error: {}\noutput: {}", self.status, self.output.trim_end()),
        }
    }
}

impl std::error::Error for ExtractionFailure {}
