//! Semantic tree construction.
//!
//! A single post-order walk over the parse tree. Each program opens a scope
//! collecting its function declarations and procedure names; function calls
//! are checked as they are met, procedure references once the whole program
//! has been seen so forward references resolve.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cobol_lsp_core::{Diagnostic, ErrorKind, Locality, Position, ResultWithErrors};

use super::grammar::{ParseNode, Rule};
use super::intrinsics::{is_intrinsic_function, lookup_function};
use super::node::{Node, NodeKind};

#[derive(Debug, Default)]
struct ProgramScope {
    /// User-defined functions declared in REPOSITORY, including those of
    /// enclosing programs.
    functions: HashSet<String>,
    sections: HashSet<String>,
    /// Paragraph names keyed by their section; `None` for paragraphs outside
    /// any section.
    paragraphs: HashMap<Option<String>, HashSet<String>>,
    references: Vec<PendingReference>,
}

#[derive(Debug)]
struct PendingReference {
    name: String,
    section: Option<String>,
    locality: Locality,
}

/// Builds the semantic tree and reports semantic rule violations.
#[derive(Debug, Default)]
pub struct SemanticBuilder {
    scopes: Vec<ProgramScope>,
    division: Option<String>,
    section: Option<String>,
    errors: Vec<Diagnostic>,
}

impl SemanticBuilder {
    /// Create a builder with no open program scopes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the tree rooted at a single program node. A document holding
    /// no program or several sibling programs gets a synthetic unnamed root.
    pub fn build(mut self, programs: Vec<ParseNode>, uri: Arc<str>) -> ResultWithErrors<Node> {
        let nodes: Vec<Node> = programs.into_iter().filter_map(|p| self.visit(p)).collect();
        let root = match <[Node; 1]>::try_from(nodes) {
            Ok([program]) => program,
            Err(nodes) => {
                let locality = match (nodes.first(), nodes.last()) {
                    (Some(first), Some(last)) => first.locality.to(&last.locality),
                    _ => Locality::point(uri, Position::new(1, 1)),
                };
                Node::new(NodeKind::Program { name: None }, locality).with_children(nodes)
            }
        };
        ResultWithErrors::new(root, self.errors)
    }

    fn visit(&mut self, parse: ParseNode) -> Option<Node> {
        let ParseNode {
            rule,
            locality,
            children,
        } = parse;

        let node = match rule {
            Rule::Program { name } => self.visit_program(name, locality, children),
            // Folded into its program by `visit_program`.
            Rule::EndProgram { .. } => return None,
            Rule::Division { name } => {
                let outer = (self.division.replace(name.clone()), self.section.take());
                let built = self.visit_all(children);
                (self.division, self.section) = outer;
                Node::new(NodeKind::Division { name }, locality)
                    .with_children(nest_data_entries(built))
            }
            Rule::Section { name } => {
                if self.in_procedure_division() {
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.sections.insert(name.clone());
                    }
                }
                let outer = self.section.replace(name.clone());
                let built = self.visit_all(children);
                self.section = outer;
                Node::new(NodeKind::Section { name }, locality)
                    .with_children(nest_data_entries(built))
            }
            Rule::Paragraph { name } => {
                if self.in_procedure_division() {
                    self.define_paragraph(&name, &locality);
                }
                let built = self.visit_all(children);
                Node::new(NodeKind::Paragraph { name }, locality).with_children(built)
            }
            Rule::DataEntry {
                level,
                name,
                picture,
            } => Node::new(
                NodeKind::DataEntry {
                    level,
                    name,
                    picture,
                },
                locality,
            ),
            Rule::Statement { verb } => {
                let built = self.visit_all(children);
                Node::new(NodeKind::Statement { verb }, locality).with_children(built)
            }
            Rule::FunctionDeclaration { name, intrinsic } => {
                self.declare_function(name.as_deref(), intrinsic, &locality);
                Node::new(NodeKind::FunctionDeclaration { name, intrinsic }, locality)
            }
            Rule::FunctionCall { name, args } => {
                let built = self.visit_all(children);
                self.check_function_call(&name, args, &locality);
                Node::new(NodeKind::FunctionReference { name, args }, locality).with_children(built)
            }
            Rule::ProcedureReference { name, section } => {
                if let Some(scope) = self.scopes.last_mut() {
                    scope.references.push(PendingReference {
                        name: name.clone(),
                        section: section.clone(),
                        locality: locality.clone(),
                    });
                }
                Node::new(NodeKind::ProcedureReference { name, section }, locality)
            }
        };
        Some(node)
    }

    fn visit_all(&mut self, children: Vec<ParseNode>) -> Vec<Node> {
        children.into_iter().filter_map(|c| self.visit(c)).collect()
    }

    fn visit_program(
        &mut self,
        name: Option<String>,
        locality: Locality,
        children: Vec<ParseNode>,
    ) -> Node {
        let inherited = self
            .scopes
            .last()
            .map(|s| s.functions.clone())
            .unwrap_or_default();
        self.scopes.push(ProgramScope {
            functions: inherited,
            ..ProgramScope::default()
        });
        let outer = (self.division.take(), self.section.take());

        let mut end_program = None;
        let mut built = Vec::new();
        for child in children {
            if let Rule::EndProgram { name: end_name } = &child.rule {
                end_program = Some((end_name.clone(), child.locality.clone()));
                continue;
            }
            built.extend(self.visit(child));
        }

        (self.division, self.section) = outer;
        let scope = self.scopes.pop().unwrap_or_default();
        self.check_procedure_references(&scope);

        if let Some((end_name, end_locality)) = end_program {
            match (&name, end_name) {
                (Some(program_id), Some(end_name)) if *program_id != end_name => {
                    self.errors.push(Diagnostic::error(
                        ErrorKind::SyntaxError,
                        format!("END PROGRAM {end_name} does not match PROGRAM-ID {program_id}"),
                        end_locality,
                    ));
                }
                (_, None) => {
                    self.errors.push(Diagnostic::error(
                        ErrorKind::SyntaxError,
                        "Missing program name in END PROGRAM",
                        end_locality,
                    ));
                }
                _ => {}
            }
        }

        Node::new(NodeKind::Program { name }, locality).with_children(built)
    }

    fn in_procedure_division(&self) -> bool {
        self.division.as_deref() == Some("PROCEDURE")
    }

    fn define_paragraph(&mut self, name: &str, locality: &Locality) {
        let section = self.section.clone();
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        let fresh = scope
            .paragraphs
            .entry(section.clone())
            .or_default()
            .insert(name.to_string());
        if fresh {
            return;
        }
        let place = match section {
            Some(section) => format!("section {section}"),
            None => "PROCEDURE DIVISION".to_string(),
        };
        self.errors.push(Diagnostic::warning(
            ErrorKind::SemanticError,
            format!("{name}: Paragraph already defined in {place}"),
            locality.clone(),
        ));
    }

    fn declare_function(&mut self, name: Option<&str>, intrinsic: bool, locality: &Locality) {
        // FUNCTION ALL INTRINSIC adds nothing: intrinsic names are always
        // callable through the FUNCTION keyword.
        let Some(name) = name else {
            return;
        };
        if intrinsic {
            if !is_intrinsic_function(name) {
                self.errors.push(Diagnostic::error(
                    ErrorKind::SemanticError,
                    format!("{name}: Unknown intrinsic function"),
                    locality.clone(),
                ));
            }
        } else if let Some(scope) = self.scopes.last_mut() {
            scope.functions.insert(name.to_string());
        }
    }

    fn check_function_call(&mut self, name: &str, args: usize, locality: &Locality) {
        if self.scopes.last().is_some_and(|s| s.functions.contains(name)) {
            return;
        }
        match lookup_function(name) {
            Some(function) if !function.accepts(args) => {
                self.errors.push(Diagnostic::error(
                    ErrorKind::SemanticError,
                    format!(
                        "{name}: Function takes {} argument(s), {args} given",
                        function.arity()
                    ),
                    locality.clone(),
                ));
            }
            Some(_) => {}
            None => {
                self.errors.push(
                    Diagnostic::error(
                        ErrorKind::SemanticError,
                        format!("{name}: Function not declared"),
                        locality.clone(),
                    )
                    .with_suggestion(format!(
                        "declare {name} with a FUNCTION entry in the REPOSITORY paragraph"
                    )),
                );
            }
        }
    }

    fn check_procedure_references(&mut self, scope: &ProgramScope) {
        for reference in &scope.references {
            let defined = match &reference.section {
                Some(section) => scope
                    .paragraphs
                    .get(&Some(section.clone()))
                    .is_some_and(|p| p.contains(&reference.name)),
                None => {
                    scope.sections.contains(&reference.name)
                        || scope.paragraphs.values().any(|p| p.contains(&reference.name))
                }
            };
            if defined {
                continue;
            }
            let message = match &reference.section {
                Some(section) => format!(
                    "{}: Paragraph not defined in section {section}",
                    reference.name
                ),
                None => format!("{}: Procedure not defined", reference.name),
            };
            self.errors.push(Diagnostic::error(
                ErrorKind::SemanticError,
                message,
                reference.locality.clone(),
            ));
        }
    }
}

fn data_level(node: &Node) -> Option<u8> {
    match node.kind {
        NodeKind::DataEntry { level, .. } => Some(level),
        _ => None,
    }
}

fn close_top(open: &mut Vec<Node>, roots: &mut Vec<Node>) {
    if let Some(node) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

fn close_all(open: &mut Vec<Node>, roots: &mut Vec<Node>) {
    while !open.is_empty() {
        close_top(open, roots);
    }
}

/// Nest data description entries by level number. Level 66 and 77 entries
/// are top-level; level 88 entries belong to the entry before them. Other
/// nodes pass through in order.
fn nest_data_entries(nodes: Vec<Node>) -> Vec<Node> {
    let mut roots = Vec::new();
    let mut open: Vec<Node> = Vec::new();

    for node in nodes {
        let Some(level) = data_level(&node) else {
            close_all(&mut open, &mut roots);
            roots.push(node);
            continue;
        };
        match level {
            88 => match open.last_mut() {
                Some(parent) => parent.children.push(node),
                None => roots.push(node),
            },
            66 | 77 => {
                close_all(&mut open, &mut roots);
                open.push(node);
            }
            _ => {
                while open
                    .last()
                    .and_then(data_level)
                    .is_some_and(|top| top >= level || top == 66 || top == 77)
                {
                    close_top(&mut open, &mut roots);
                }
                open.push(node);
            }
        }
    }

    close_all(&mut open, &mut roots);
    roots
}
