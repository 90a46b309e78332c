//! Error types for the analysis engine.
//!
//! Only infrastructure failures are errors. Everything a user can fix in
//! their source (missing copybooks, bad directives, grammar violations) is a
//! [`cobol_lsp_core::Diagnostic`] instead.

use cobol_lsp_core::ErrorKind;
use miette::Diagnostic;
use thiserror::Error;

/// Fatal analysis failures.
#[derive(Debug, Error, Diagnostic)]
pub enum AnalysisError {
    /// The document could not be read.
    #[error("failed to read document {path}: {source}")]
    #[diagnostic(code(analysis::io_error))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be loaded or used.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(analysis::config_error))]
    Config { message: String },

    /// The analysis was superseded and stopped early.
    #[error("analysis of {uri} was cancelled")]
    #[diagnostic(code(analysis::cancelled))]
    Cancelled { uri: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failures of a copybook hierarchy push.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum HierarchyError {
    /// The copybook is already being expanded further up the stack.
    #[error("{name}: Circular dependency detected ({path})")]
    #[diagnostic(code(copybook::circular_dependency))]
    CircularDependency { name: String, path: String },

    /// Expanding the copybook would nest deeper than allowed.
    #[error("{name}: Maximum copybook nesting depth ({max_depth}) exceeded")]
    #[diagnostic(code(copybook::max_depth_exceeded))]
    MaxDepthExceeded { name: String, max_depth: usize },
}

impl HierarchyError {
    /// The diagnostic kind this failure is reported as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HierarchyError::CircularDependency { .. } => ErrorKind::CircularDependency,
            HierarchyError::MaxDepthExceeded { .. } => ErrorKind::MaxDepthExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_error_display() {
        let e = HierarchyError::CircularDependency {
            name: "SELF".to_string(),
            path: "SELF -> SELF".to_string(),
        };
        assert_eq!(e.to_string(), "SELF: Circular dependency detected (SELF -> SELF)");
        assert_eq!(e.kind(), ErrorKind::CircularDependency);

        let e = HierarchyError::MaxDepthExceeded {
            name: "DEEP".to_string(),
            max_depth: 3,
        };
        assert_eq!(e.kind(), ErrorKind::MaxDepthExceeded);
        assert!(e.to_string().contains("(3)"));
    }

    #[test]
    fn test_analysis_error_display() {
        let e = AnalysisError::Cancelled {
            uri: "file:///a.cbl".to_string(),
        };
        assert_eq!(e.to_string(), "analysis of file:///a.cbl was cancelled");
    }
}
