//! courgette-validate: the Courgette diagnostics engine.
//!
//! [`validate()`] is total and side-effect-free: it always returns a
//! (possibly empty) list of findings in document order and never fails.
//! Structural and semantic problems are `error` findings, style problems
//! are `warning` findings; none of them stop compilation, which is
//! best-effort by design.
//!
//! Condition and outcome phrases are checked through the same grammar in
//! `courgette_core::phrase` that the compiler parses with, so a phrase
//! validates cleanly exactly when it compiles to a recognized node.
//!
//! [`ValidationService`] wraps the engine in a worker thread for callers
//! that validate on every edit.

use serde::Serialize;

pub mod rules;
pub mod service;

pub use service::ValidationService;

/// Finding severity. `Info` is part of the reporting surface even though
/// the current rule set only produces errors and warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// One validation finding.
///
/// `line` and `column` are 1-based for human display; the offsets are
/// absolute character positions into the validated text, so a caller can
/// highlight `text[start_offset..end_offset]` without re-scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
    pub severity: Severity,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// Validate Courgette source text.
pub fn validate(text: &str) -> Vec<Diagnostic> {
    rules::check(&courgette_core::segment(text))
}
