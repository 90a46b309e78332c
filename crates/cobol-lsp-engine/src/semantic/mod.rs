//! Semantic analysis of an expanded document.
//!
//! [`SemanticParser`] runs the program grammar over the significant tokens of
//! an [`ExtendedDocument`] and then builds the semantic tree in one post-order
//! walk. Every node keeps the locality of the tokens it came from, so nodes
//! built from copybook text point back through the inclusion chain.

pub mod builder;
pub mod grammar;
pub mod intrinsics;
pub mod node;

use std::sync::Arc;

use cobol_lsp_core::ResultWithErrors;
use tracing::debug;

use crate::document::ExtendedDocument;
use builder::SemanticBuilder;
use grammar::GrammarParser;

pub use grammar::{ParseNode, Rule};
pub use intrinsics::{lookup_function, FunctionCategory, FunctionResultType, IntrinsicFunction};
pub use node::{Node, NodeKind};

/// Turns an expanded document into a semantic tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticParser;

impl SemanticParser {
    /// Create a parser.
    pub fn new() -> Self {
        Self
    }

    /// Parse `document`. The diagnostics start with those of preprocessing,
    /// followed by grammar and semantic diagnostics.
    pub fn parse(&self, document: &ExtendedDocument) -> ResultWithErrors<Node> {
        let uri: Arc<str> = Arc::from(document.uri());
        let mut errors = document.diagnostics().to_vec();
        let preprocessing = errors.len();

        let programs = GrammarParser::new(Arc::clone(&uri), document.significant_tokens().collect())
            .parse()
            .accumulate_errors(&mut errors);
        let tree = SemanticBuilder::new()
            .build(programs, uri)
            .accumulate_errors(&mut errors);

        debug!(
            uri = document.uri(),
            nodes = tree.descendants().count(),
            diagnostics = errors.len() - preprocessing,
            "semantic analysis finished"
        );
        ResultWithErrors::new(tree, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMap;
    use crate::lexer::SourceFormat;
    use cobol_lsp_core::{Diagnostic, ErrorKind, Locality, Position};

    #[test]
    fn test_preprocessing_diagnostics_come_first() {
        let map = DocumentMap::from_text(
            "main".into(),
            "ID DIVISION.\nPROGRAM-ID. P.\nPROCEDURE DIVISION.\n    DISPLAY FUNCTION NOPE.\n",
            SourceFormat::Free,
        )
        .result;
        let earlier = Diagnostic::error(
            ErrorKind::CopybookNotFound,
            "X: Copybook not found",
            Locality::point("main", Position::new(1, 1)),
        );
        let document = ExtendedDocument::new(
            map.shared_uri(),
            map.into_tokens(),
            Vec::new(),
            vec![earlier.clone()],
        );

        let result = SemanticParser::new().parse(&document);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0], earlier);
        assert_eq!(result.errors[1].message, "NOPE: Function not declared");
        assert_eq!(result.result.name(), Some("P"));
    }
}
