//! Token definitions.

use cobol_lsp_core::{Located, Locality};

/// Lexical kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A character-string: reserved word, user word, number, PICTURE string.
    Word,
    /// Alphanumeric, hexadecimal, national or null-terminated literal,
    /// quotes included.
    StringLiteral,
    /// Separator period.
    Period,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `==`
    PseudoTextDelimiter,
    /// A run of spaces or tabs.
    Whitespace,
    /// A line terminator.
    Newline,
    /// Comment line or floating `*>` comment.
    Comment,
    /// Fixed-format sequence, indicator or identification area.
    SequenceArea,
    /// Zero-width stand-in for a directive that could not be expanded.
    Placeholder,
    /// Zero-width marker where a REPLACE directive took effect; the value
    /// indexes the directive table of the running expansion.
    ReplaceBoundary(usize),
}

impl TokenKind {
    /// Tokens that carry no meaning for the grammar or for substitution
    /// matching.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Newline | TokenKind::Comment | TokenKind::SequenceArea
        )
    }

    /// Zero-width markers that text substitution never matches across.
    pub fn is_marker(&self) -> bool {
        matches!(self, TokenKind::Placeholder | TokenKind::ReplaceBoundary(_))
    }
}

/// A text fragment, its lexical kind and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical kind.
    pub kind: TokenKind,
    /// The exact text (empty for markers).
    pub text: String,
    /// Provenance.
    pub locality: Locality,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<String>, locality: Locality) -> Self {
        Self {
            kind,
            text: text.into(),
            locality,
        }
    }

    /// A zero-width placeholder at the given call site.
    pub fn placeholder(call_site: Locality) -> Self {
        Self::new(TokenKind::Placeholder, String::new(), call_site)
    }

    /// Whether this token matters to the grammar.
    pub fn is_significant(&self) -> bool {
        !self.kind.is_trivia() && !self.kind.is_marker()
    }

    /// Whether this is a word equal to `word`, ignoring case.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(word)
    }

    /// Text used for comparisons: words are case-insensitive, literals are
    /// compared as written.
    pub fn match_text(&self) -> String {
        match self.kind {
            TokenKind::Word => self.text.to_ascii_uppercase(),
            _ => self.text.clone(),
        }
    }

    /// The value of an alphanumeric literal without its quotes, or the word
    /// itself. Used for copybook and library names.
    pub fn name_value(&self) -> String {
        match self.kind {
            TokenKind::StringLiteral => {
                let inner = self.text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
                inner
                    .get(1..inner.len().saturating_sub(1))
                    .unwrap_or_default()
                    .to_string()
            }
            _ => self.text.clone(),
        }
    }
}

impl Located for Token {
    fn locality(&self) -> &Locality {
        &self.locality
    }
}
