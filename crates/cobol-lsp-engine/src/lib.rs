//! COBOL analysis engine.
//!
//! This crate turns raw COBOL source into a fully expanded document and a
//! semantic tree, keeping the provenance of every token:
//! - Lexer: lossless tokenization of free and fixed format source
//! - Copybooks: inclusion stack, registries, shared resolution cache
//! - Preprocessor: COPY and REPLACE expansion
//! - Semantic: program grammar and semantic tree construction
//!
//! # Architecture
//!
//! One analysis runs these stages in order:
//! 1. The source text is scanned into a [`DocumentMap`]
//! 2. The [`GrammarPreprocessor`] expands COPY statements and applies
//!    REPLACING and REPLACE, producing an [`ExtendedDocument`]
//! 3. The [`SemanticParser`] parses the expanded tokens and builds the tree
//!
//! [`AnalysisEngine`] wires the stages together. Problems in the source are
//! reported as [`cobol_lsp_core::Diagnostic`]s; only infrastructure failures
//! are [`AnalysisError`]s.

pub mod cancel;
pub mod config;
pub mod copybook;
pub mod document;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod preprocessor;
pub mod semantic;

pub use cancel::CancellationToken;
pub use config::{
    AnalysisSettings, CopybookConfig, CopybookPaths, CopybookProcessingMode, RegistrySettings,
    SqlBackend,
};
pub use copybook::{
    CopybookCache, CopybookHierarchy, CopybookRegistry, CopybookResolver, CopybookSource,
    FileSystemRegistry, HierarchyFrame, InMemoryRegistry, ResolvedCopybook,
};
pub use document::{CopybookUsage, DocumentMap, ExtendedDocument, MappedSpan};
pub use engine::{AnalysisEngine, AnalysisResult};
pub use error::{AnalysisError, HierarchyError, Result};
pub use lexer::{scan, SourceFormat, Token, TokenKind};
pub use preprocessor::{GrammarPreprocessor, PreprocessorState, ReplacingService};
pub use semantic::{Node, NodeKind, SemanticParser};
