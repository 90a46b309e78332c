//! Document token streams before and after expansion.

use std::sync::Arc;

use cobol_lsp_core::{Diagnostic, LineIndex, Locality, Position, ResultWithErrors};

use crate::lexer::{scan, SourceFormat, Token};

/// The token stream of one document as it enters preprocessing.
///
/// Owned by exactly one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMap {
    uri: Arc<str>,
    tokens: Vec<Token>,
}

impl DocumentMap {
    /// Tokenize `text` into a document map.
    pub fn from_text(uri: Arc<str>, text: &str, format: SourceFormat) -> ResultWithErrors<Self> {
        scan(text, Arc::clone(&uri), format).map(|tokens| Self { uri, tokens })
    }

    /// Wrap an existing token stream.
    pub fn from_tokens(uri: Arc<str>, tokens: Vec<Token>) -> Self {
        Self { uri, tokens }
    }

    /// Document identifier.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Shared document identifier.
    pub fn shared_uri(&self) -> Arc<str> {
        Arc::clone(&self.uri)
    }

    /// The tokens in order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Take the tokens out.
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Reassemble the text.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

/// A copybook inclusion found while expanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopybookUsage {
    /// Upper-cased copybook name.
    pub name: String,
    /// Locality of the name in the directive.
    pub locality: Locality,
    /// Where the copybook text came from, if it was resolved.
    pub uri: Option<Arc<str>>,
}

/// A byte range of the expanded text and the provenance of its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedSpan {
    /// Start byte offset in the expanded text.
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// Provenance of the token.
    pub locality: Locality,
}

/// The fully expanded document. Immutable once built.
#[derive(Debug, Clone)]
pub struct ExtendedDocument {
    uri: Arc<str>,
    text: String,
    tokens: Vec<Token>,
    mapping: Vec<MappedSpan>,
    line_index: LineIndex,
    copybooks: Vec<CopybookUsage>,
    diagnostics: Vec<Diagnostic>,
}

impl ExtendedDocument {
    /// Build the document from its final token stream.
    pub fn new(
        uri: Arc<str>,
        tokens: Vec<Token>,
        copybooks: Vec<CopybookUsage>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let mut text = String::new();
        let mut mapping = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let start = text.len();
            text.push_str(&token.text);
            mapping.push(MappedSpan {
                start,
                end: text.len(),
                locality: token.locality.clone(),
            });
        }
        let line_index = LineIndex::new(&text);
        Self {
            uri,
            text,
            tokens,
            mapping,
            line_index,
            copybooks,
            diagnostics,
        }
    }

    /// Identifier of the top-level document.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The expanded text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Final tokens, including trivia and placeholders.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tokens the grammar consumes.
    pub fn significant_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.is_significant())
    }

    /// The offset-to-provenance table, one entry per token.
    pub fn mapping(&self) -> &[MappedSpan] {
        &self.mapping
    }

    /// Line index over the expanded text.
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Copybook inclusions in document order.
    pub fn copybooks(&self) -> &[CopybookUsage] {
        &self.copybooks
    }

    /// Diagnostics accumulated during expansion, in document order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Provenance of the text at a byte offset of the expanded text.
    pub fn locality_at(&self, offset: usize) -> Option<&Locality> {
        let idx = self.mapping.partition_point(|span| span.end <= offset);
        self.mapping
            .get(idx)
            .filter(|span| span.start <= offset)
            .map(|span| &span.locality)
    }

    /// Provenance of the text at a 1-based position of the expanded text.
    pub fn locality_at_position(&self, pos: Position) -> Option<&Locality> {
        let offset = self.line_index.offset(&self.text, pos)?;
        self.locality_at(offset)
    }

    /// The copybook usage whose name covers a position of the top-level
    /// document.
    pub fn copybook_at(&self, uri: &str, pos: Position) -> Option<&CopybookUsage> {
        self.copybooks
            .iter()
            .find(|usage| usage.locality.uri() == uri && usage.locality.range().contains(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_map_round_trip() {
        let text = "01 A.\r\n01 B.\n";
        let doc = DocumentMap::from_text("main".into(), text, SourceFormat::Free);
        assert!(doc.errors.is_empty());
        assert_eq!(doc.result.text(), text);
        assert_eq!(doc.result.uri(), "main");
    }

    #[test]
    fn test_locality_at_maps_offsets() {
        let map = DocumentMap::from_text("main".into(), "01 A.\n01 B.\n", SourceFormat::Free).result;
        let doc = ExtendedDocument::new(map.shared_uri(), map.into_tokens(), Vec::new(), Vec::new());

        let loc = doc.locality_at(7).unwrap();
        assert_eq!(loc.start(), Position::new(2, 1));
        assert_eq!(loc.end(), Position::new(2, 3));
        assert_eq!(doc.locality_at(6).unwrap().start(), Position::new(2, 1));
        assert!(doc.locality_at(100).is_none());

        let by_pos = doc.locality_at_position(Position::new(2, 4)).unwrap();
        assert_eq!(by_pos.start(), Position::new(2, 4));
    }

    #[test]
    fn test_zero_width_entries_are_skipped() {
        let mut tokens = DocumentMap::from_text("main".into(), "A B", SourceFormat::Free)
            .result
            .into_tokens();
        let call_site = Locality::point("main", Position::new(1, 2));
        tokens.insert(1, Token::placeholder(call_site));
        let doc = ExtendedDocument::new("main".into(), tokens, Vec::new(), Vec::new());
        assert_eq!(doc.text(), "A B");
        assert_eq!(doc.locality_at(1).unwrap().start(), Position::new(1, 2));
        assert_eq!(doc.locality_at(1).unwrap().end(), Position::new(1, 3));
        assert_eq!(doc.significant_tokens().count(), 2);
    }

    #[test]
    fn test_copybook_at() {
        let usage = CopybookUsage {
            name: "ABC".to_string(),
            locality: Locality::new(
                "main",
                cobol_lsp_core::Range::new(Position::new(2, 10), Position::new(2, 13)),
            ),
            uri: Some("ABC".into()),
        };
        let doc = ExtendedDocument::new("main".into(), Vec::new(), vec![usage], Vec::new());
        assert_eq!(doc.copybook_at("main", Position::new(2, 11)).unwrap().name, "ABC");
        assert!(doc.copybook_at("main", Position::new(2, 13)).is_none());
    }
}
