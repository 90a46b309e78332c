//! Diagnostic types for analysis error/warning reporting.
//!
//! Every pipeline stage reports problems as [`Diagnostic`] values rather than
//! failing. The list is handed to the host untouched; rendering and transport
//! are not the core's concern.

use std::fmt;

use crate::locality::Locality;

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Error: the construct could not be processed as written.
    Error,
    /// Warning: processing continued but something looks wrong.
    Warning,
    /// Informational.
    Info,
}

/// The category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    /// A copybook includes itself, directly or transitively.
    CircularDependency,
    /// Copybook nesting went past the configured limit.
    MaxDepthExceeded,
    /// The registry has no copybook with the requested name.
    CopybookNotFound,
    /// A malformed substitution clause.
    ReplaceClauseError,
    /// The text violates the language grammar.
    SyntaxError,
    /// The text is well-formed but breaks a semantic rule.
    SemanticError,
}

impl ErrorKind {
    /// Stable code shown to users.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::CircularDependency => "COPY-E001",
            ErrorKind::MaxDepthExceeded => "COPY-E002",
            ErrorKind::CopybookNotFound => "COPY-E003",
            ErrorKind::ReplaceClauseError => "REPL-E001",
            ErrorKind::SyntaxError => "SYN-E001",
            ErrorKind::SemanticError => "SEM-E001",
        }
    }
}

/// A diagnostic produced by the analysis pipeline.
///
/// # Example
///
/// ```
/// use cobol_lsp_core::{Diagnostic, ErrorKind, Locality, Position, Severity};
///
/// let at = Locality::point("file:///prog.cbl", Position::new(2, 5));
/// let d = Diagnostic::error(ErrorKind::CopybookNotFound, "MISSING: Copybook not found", at)
///     .with_suggestion("Check the copybook search folders");
///
/// assert_eq!(d.severity, Severity::Error);
/// assert_eq!(d.code(), "COPY-E003");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Category of the problem.
    pub kind: ErrorKind,
    /// Severity of the diagnostic.
    pub severity: Severity,
    /// Where the problem was found.
    pub locality: Locality,
    /// Human-readable message.
    pub message: String,
    /// Optional hint for fixing the problem.
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic with an explicit severity.
    pub fn new(
        kind: ErrorKind,
        severity: Severity,
        message: impl Into<String>,
        locality: Locality,
    ) -> Self {
        Self {
            kind,
            severity,
            locality,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(kind: ErrorKind, message: impl Into<String>, locality: Locality) -> Self {
        Self::new(kind, Severity::Error, message, locality)
    }

    /// Create a new warning diagnostic.
    pub fn warning(kind: ErrorKind, message: impl Into<String>, locality: Locality) -> Self {
        Self::new(kind, Severity::Warning, message, locality)
    }

    /// Create a new info diagnostic.
    pub fn info(kind: ErrorKind, message: impl Into<String>, locality: Locality) -> Self {
        Self::new(kind, Severity::Info, message, locality)
    }

    /// Add a suggestion to this diagnostic.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Stable code of the diagnostic kind.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Returns `true` if this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Returns `true` if this diagnostic is a warning.
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Sort diagnostics by locality, then severity. The sort is stable, so
/// diagnostics at the same place keep their emission order.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.locality
            .cmp(&b.locality)
            .then(a.severity.cmp(&b.severity))
    });
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code(), self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}
