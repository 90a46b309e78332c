//! Semantic tree nodes.

use cobol_lsp_core::{Locality, Located};

/// Variant-specific data of a [`Node`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A program. `name` is `None` for the synthetic root of a document
    /// that does not hold exactly one program.
    Program { name: Option<String> },
    /// IDENTIFICATION, ENVIRONMENT, DATA or PROCEDURE.
    Division { name: String },
    Section { name: String },
    Paragraph { name: String },
    /// A data description entry. `name` is `None` for FILLER and unnamed
    /// entries.
    DataEntry {
        level: u8,
        name: Option<String>,
        picture: Option<String>,
    },
    /// A procedure statement, named by its verb.
    Statement { verb: String },
    /// A REPOSITORY `FUNCTION` declaration. `name` is `None` for
    /// `FUNCTION ALL INTRINSIC`.
    FunctionDeclaration { name: Option<String>, intrinsic: bool },
    /// A `FUNCTION name(args)` call.
    FunctionReference { name: String, args: usize },
    /// A PERFORM or GO TO target, optionally qualified by its section.
    ProcedureReference {
        name: String,
        section: Option<String>,
    },
}

/// A semantic tree node. Nodes form a strict tree; every node carries the
/// provenance of the tokens it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub locality: Locality,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    /// Create a leaf node.
    pub fn new(kind: NodeKind, locality: Locality) -> Self {
        Self {
            locality,
            kind,
            children: Vec::new(),
        }
    }

    /// Attach children.
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// The node's name, for the variants that have one.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Program { name }
            | NodeKind::DataEntry { name, .. }
            | NodeKind::FunctionDeclaration { name, .. } => name.as_deref(),
            NodeKind::Division { name }
            | NodeKind::Section { name }
            | NodeKind::Paragraph { name }
            | NodeKind::FunctionReference { name, .. }
            | NodeKind::ProcedureReference { name, .. } => Some(name),
            NodeKind::Statement { verb } => Some(verb),
        }
    }

    /// Pre-order iterator over this node and all its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// All descendants (and self) matching `predicate`, in document order.
    pub fn find_all<'a>(&'a self, predicate: impl Fn(&NodeKind) -> bool) -> Vec<&'a Node> {
        self.descendants().filter(|n| predicate(&n.kind)).collect()
    }
}

impl Located for Node {
    fn locality(&self) -> &Locality {
        &self.locality
    }
}

/// Iterator returned by [`Node::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
