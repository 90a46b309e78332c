//! COBOL lexical analysis.
//!
//! The scanner is lossless: every byte of the input ends up in exactly one
//! token, whitespace, line terminators and comments included. Concatenating
//! the token texts gives back the input, which is what lets the preprocessor
//! rewrite a token stream while keeping exact source positions.
//!
//! # Example
//!
//! ```
//! use cobol_lsp_engine::lexer::{scan, SourceFormat};
//!
//! let result = scan("01 X.\n", "main".into(), SourceFormat::Free);
//! let text: String = result.result.iter().map(|t| t.text.as_str()).collect();
//! assert_eq!(text, "01 X.\n");
//! assert!(result.errors.is_empty());
//! ```

pub mod scanner;
pub mod source;
pub mod token;

pub use scanner::{scan, scan_with_chain, Scanner};
pub use source::{split_lines, Indicator, SourceFormat, SourceLine};
pub use token::{Token, TokenKind};
