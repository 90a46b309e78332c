//! Shared types for the COBOL analysis engine.
//!
//! This crate provides the value types every stage of the analysis pipeline
//! exchanges:
//!
//! - **Source provenance**: [`Locality`], [`Position`], [`Range`],
//!   [`InclusionFrame`]
//! - **Diagnostics**: [`Diagnostic`], [`Severity`], [`ErrorKind`]
//! - **Error accumulation**: [`ResultWithErrors`]
//! - **Offset bookkeeping**: [`LineIndex`]
//! - **Pipeline traits**: [`Located`], [`Lexer`]
//!
//! # Design Principles
//!
//! - **Zero dependencies**: plain Rust types and traits only. The engine crate
//!   layers `thiserror`/`miette` on top for its fatal errors.
//! - **Immutable provenance**: a [`Locality`] never changes once produced;
//!   inclusion chains are shared behind an `Arc`.

mod diagnostic;
mod line_index;
mod locality;
mod result;
mod traits;

pub use diagnostic::{sort_diagnostics, Diagnostic, ErrorKind, Severity};
pub use line_index::LineIndex;
pub use locality::{InclusionChain, InclusionFrame, Locality, Position, Range};
pub use result::ResultWithErrors;
pub use traits::{Lexer, Located};
