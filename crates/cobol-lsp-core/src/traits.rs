//! Shared traits for analysis pipeline stages.

use crate::locality::Locality;

/// Anything that knows where it came from in the source.
///
/// Tokens and semantic tree nodes implement this so generic tooling
/// (hover, go-to-definition, diagnostics) can reach the provenance of any
/// element without knowing its concrete type.
pub trait Located {
    /// The provenance of this element.
    fn locality(&self) -> &Locality;
}

/// Common interface for lexers.
///
/// The lexer recovers from errors where possible, returning both the tokens
/// it could produce and the errors it found.
pub trait Lexer {
    /// The token type produced by this lexer.
    type Token;
    /// The error type produced by this lexer.
    type Error;

    /// Tokenize the given source text.
    fn tokenize(&mut self, source: &str) -> (Vec<Self::Token>, Vec<Self::Error>);
}
