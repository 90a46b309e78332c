//! Copybook expansion and text substitution.
//!
//! [`GrammarPreprocessor`] turns a [`DocumentMap`] into an
//! [`ExtendedDocument`]. It runs as a state machine over an explicit stack of
//! expansion levels, one per copybook being expanded, so nesting depth and
//! cancellation are checked at every step instead of relying on native
//! recursion.
//!
//! Substitution order:
//!
//! 1. `COPY ... REPLACING` applies to the text of the copybook it names once
//!    that copybook's own nested inclusions are expanded, so the innermost
//!    `REPLACING` runs first and each enclosing one runs as the text is
//!    spliced outward.
//! 2. `REPLACE` directives apply last, over the fully expanded stream, in
//!    stream order. A `REPLACE` inside a copybook takes effect at its
//!    expanded position.

pub mod directives;
pub mod replacing;

use std::sync::Arc;

use cobol_lsp_core::{Diagnostic, Locality};
use tracing::{debug, trace};

use crate::cancel::CancellationToken;
use crate::config::{CopybookConfig, CopybookProcessingMode};
use crate::copybook::{CopybookHierarchy, CopybookResolver};
use crate::document::{CopybookUsage, DocumentMap, ExtendedDocument};
use crate::error::{AnalysisError, Result};
use crate::lexer::{scan_with_chain, SourceFormat, Token, TokenKind};

use directives::{CopyDirective, Directive, ReplaceDirective};

pub use directives::{directive_at, parse_directive, DirectiveKind, ParsedDirective};
pub use replacing::{MatchMode, Replacement, ReplacingService};

/// States of the expansion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessorState {
    /// Copying tokens to the output, looking for a directive.
    Scanning,
    /// Parsing the arguments of a directive.
    InDirective,
    /// Entering a copybook.
    Expanding,
    /// The whole stream has been processed.
    Done,
}

/// Expands inclusion directives and applies substitution directives.
#[derive(Debug, Clone)]
pub struct GrammarPreprocessor {
    resolver: CopybookResolver,
    replacing: ReplacingService,
    format: SourceFormat,
}

impl GrammarPreprocessor {
    /// Create a preprocessor. Copybook text is scanned in `format`.
    pub fn new(resolver: CopybookResolver, replacing: ReplacingService, format: SourceFormat) -> Self {
        Self {
            resolver,
            replacing,
            format,
        }
    }

    /// Expand `document` into its final form.
    ///
    /// Directive problems become diagnostics and placeholders; the only
    /// error is cancellation, returned after every frame this call pushed on
    /// `hierarchy` has been popped again.
    pub fn build_extended_document(
        &self,
        document: DocumentMap,
        config: &CopybookConfig,
        hierarchy: &mut CopybookHierarchy,
        cancel: &CancellationToken,
    ) -> Result<ExtendedDocument> {
        let uri = document.shared_uri();
        let expansion = Expansion {
            preprocessor: self,
            config,
            hierarchy,
            cancel,
            uri,
            state: PreprocessorState::Scanning,
            stack: vec![ExpansionLevel::root(document.into_tokens())],
            pending: None,
            replace_table: Vec::new(),
            copybooks: Vec::new(),
            diagnostics: Vec::new(),
        };
        expansion.run()
    }
}

/// One stream being scanned: the top-level document or a copybook.
#[derive(Debug)]
struct ExpansionLevel {
    tokens: Vec<Token>,
    cursor: usize,
    output: Vec<Token>,
    /// `None` for the top-level document.
    copy: Option<ActiveCopy>,
}

#[derive(Debug)]
struct ActiveCopy {
    name: String,
    replacing: Vec<Replacement>,
}

impl ExpansionLevel {
    fn root(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            cursor: 0,
            output: Vec::new(),
            copy: None,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.tokens.len()
    }
}

/// An inclusion waiting to be expanded.
#[derive(Debug)]
struct PendingCopy {
    directive: CopyDirective,
    call_site: Locality,
}

/// State of one `build_extended_document` call.
struct Expansion<'a> {
    preprocessor: &'a GrammarPreprocessor,
    config: &'a CopybookConfig,
    hierarchy: &'a mut CopybookHierarchy,
    cancel: &'a CancellationToken,
    uri: Arc<str>,
    state: PreprocessorState,
    stack: Vec<ExpansionLevel>,
    pending: Option<PendingCopy>,
    replace_table: Vec<ReplaceDirective>,
    copybooks: Vec<CopybookUsage>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Expansion<'a> {
    fn run(mut self) -> Result<ExtendedDocument> {
        loop {
            match self.state {
                PreprocessorState::Scanning => self.scan()?,
                PreprocessorState::InDirective => self.read_directive(),
                PreprocessorState::Expanding => self.expand()?,
                PreprocessorState::Done => break,
            }
        }
        Ok(self.finish())
    }

    fn transition(&mut self, next: PreprocessorState) {
        trace!(from = ?self.state, to = ?next, depth = self.hierarchy.depth(), "preprocessor state");
        self.state = next;
    }

    fn cancelled(&mut self) -> AnalysisError {
        // Every level above the root holds exactly one hierarchy frame.
        for _ in 1..self.stack.len() {
            self.hierarchy.pop();
        }
        self.stack.truncate(1);
        debug!(uri = %self.uri, "analysis cancelled");
        AnalysisError::Cancelled {
            uri: self.uri.to_string(),
        }
    }

    fn scan(&mut self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }

        let Some(level) = self.stack.last_mut() else {
            self.transition(PreprocessorState::Done);
            return Ok(());
        };

        if level.is_exhausted() {
            if self.stack.len() == 1 {
                self.transition(PreprocessorState::Done);
            } else {
                self.leave_copybook();
            }
            return Ok(());
        }

        if directive_at(&level.tokens, level.cursor).is_some() {
            self.transition(PreprocessorState::InDirective);
        } else {
            let token = level.tokens[level.cursor].clone();
            level.output.push(token);
            level.cursor += 1;
        }
        Ok(())
    }

    fn read_directive(&mut self) {
        let Some(level) = self.stack.last_mut() else {
            self.transition(PreprocessorState::Done);
            return;
        };
        let Some(parsed) = parse_directive(&level.tokens, level.cursor) else {
            self.transition(PreprocessorState::Scanning);
            return;
        };

        level.cursor = parsed.end;
        trim_indentation(&mut level.output);
        self.diagnostics.extend(parsed.errors);

        match parsed.directive {
            Some(Directive::Copy(directive)) => {
                self.pending = Some(PendingCopy {
                    directive,
                    call_site: parsed.locality,
                });
                self.transition(PreprocessorState::Expanding);
            }
            Some(Directive::Replace(directive)) => {
                let index = self.replace_table.len();
                self.replace_table.push(directive);
                level.output.push(Token::new(
                    TokenKind::ReplaceBoundary(index),
                    String::new(),
                    parsed.locality,
                ));
                self.transition(PreprocessorState::Scanning);
            }
            None => {
                level.output.push(Token::placeholder(parsed.locality));
                self.transition(PreprocessorState::Scanning);
            }
        }
    }

    fn expand(&mut self) -> Result<()> {
        let Some(PendingCopy {
            directive,
            call_site,
        }) = self.pending.take()
        else {
            self.transition(PreprocessorState::Scanning);
            return Ok(());
        };

        self.copybooks.push(CopybookUsage {
            name: directive.name.clone(),
            locality: directive.name_locality.clone(),
            uri: None,
        });
        let usage = self.copybooks.len() - 1;

        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }

        if self.config.mode == CopybookProcessingMode::Disabled {
            trace!(copybook = %directive.name, "copybook processing disabled");
            self.emit_placeholder(call_site);
            return Ok(());
        }

        if let Err(e) = self.hierarchy.push(&directive.name, call_site.clone()) {
            debug!(copybook = %directive.name, error = %e, "copybook not expanded");
            self.diagnostics
                .push(Diagnostic::error(e.kind(), e.to_string(), call_site.clone()));
            self.emit_placeholder(call_site);
            return Ok(());
        }

        let resolved = self
            .preprocessor
            .resolver
            .resolve(&directive.name, &call_site, self.config)
            .accumulate_errors(&mut self.diagnostics);

        let Some(source) = resolved.source else {
            self.hierarchy.pop();
            self.emit_placeholder(call_site);
            return Ok(());
        };

        self.copybooks[usage].uri = Some(Arc::clone(&source.uri));
        debug!(
            copybook = %directive.name,
            uri = %source.uri,
            depth = self.hierarchy.depth(),
            "expanding copybook"
        );

        let tokens = scan_with_chain(
            &source.text,
            Arc::clone(&source.uri),
            self.hierarchy.current_chain(),
            self.preprocessor.format,
        )
        .accumulate_errors(&mut self.diagnostics);

        self.stack.push(ExpansionLevel {
            tokens,
            cursor: 0,
            output: Vec::new(),
            copy: Some(ActiveCopy {
                name: directive.name,
                replacing: directive.replacing,
            }),
        });
        self.transition(PreprocessorState::Scanning);
        Ok(())
    }

    fn emit_placeholder(&mut self, call_site: Locality) {
        if let Some(level) = self.stack.last_mut() {
            level.output.push(Token::placeholder(call_site));
        }
        self.transition(PreprocessorState::Scanning);
    }

    /// Splice a finished copybook into the level that included it.
    fn leave_copybook(&mut self) {
        let Some(level) = self.stack.pop() else {
            return;
        };
        let mut output = level.output;
        drop_trailing_newline(&mut output);

        if let Some(copy) = level.copy {
            if !copy.replacing.is_empty() {
                output = self.preprocessor.replacing.apply(&output, &copy.replacing);
            }
            trace!(copybook = %copy.name, tokens = output.len(), "copybook spliced");
            self.hierarchy.pop();
        }

        if let Some(parent) = self.stack.last_mut() {
            parent.output.extend(output);
        }
    }

    fn finish(mut self) -> ExtendedDocument {
        let tokens = self
            .stack
            .pop()
            .map(|root| root.output)
            .unwrap_or_default();
        let tokens = apply_replace_directives(&self.preprocessor.replacing, tokens, &self.replace_table);
        debug!(
            uri = %self.uri,
            tokens = tokens.len(),
            copybooks = self.copybooks.len(),
            diagnostics = self.diagnostics.len(),
            "expansion finished"
        );
        ExtendedDocument::new(self.uri, tokens, self.copybooks, self.diagnostics)
    }
}

/// Apply `REPLACE` directives over the expanded stream. Boundary markers
/// split the stream into segments, each processed with the replacement sets
/// active at its start; the markers themselves are dropped.
fn apply_replace_directives(
    service: &ReplacingService,
    tokens: Vec<Token>,
    table: &[ReplaceDirective],
) -> Vec<Token> {
    if table.is_empty() {
        return tokens;
    }

    let mut sets: Vec<Vec<Replacement>> = Vec::new();
    let mut active: Vec<Replacement> = Vec::new();
    let mut output = Vec::with_capacity(tokens.len());
    let mut segment_start = 0;

    for (i, token) in tokens.iter().enumerate() {
        let TokenKind::ReplaceBoundary(index) = token.kind else {
            continue;
        };
        output.extend(service.apply(&tokens[segment_start..i], &active));
        segment_start = i + 1;

        match table.get(index) {
            Some(ReplaceDirective::Set {
                also: false,
                replacements,
            }) => {
                sets.clear();
                sets.push(replacements.clone());
            }
            Some(ReplaceDirective::Set {
                also: true,
                replacements,
            }) => sets.push(replacements.clone()),
            Some(ReplaceDirective::Off { last: true }) => {
                sets.pop();
            }
            Some(ReplaceDirective::Off { last: false }) => sets.clear(),
            None => {}
        }
        // The most recently added set takes precedence.
        active = sets.iter().rev().flatten().cloned().collect();
    }
    output.extend(service.apply(&tokens[segment_start..], &active));
    output
}

/// Drop the indentation before a directive that starts its line.
fn trim_indentation(output: &mut Vec<Token>) {
    let blanks = output
        .iter()
        .rev()
        .take_while(|t| t.kind == TokenKind::Whitespace)
        .count();
    if blanks == 0 {
        return;
    }
    let at_line_start = match output.len().checked_sub(blanks + 1) {
        None => true,
        Some(i) => matches!(output[i].kind, TokenKind::Newline | TokenKind::SequenceArea),
    };
    if at_line_start {
        output.truncate(output.len() - blanks);
    }
}

/// Drop the final line terminator of copybook text; the call site's own
/// terminator follows the splice.
fn drop_trailing_newline(output: &mut Vec<Token>) {
    if output.last().is_some_and(|t| t.kind == TokenKind::Newline) {
        output.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copybook::{CopybookCache, CopybookRegistry, CopybookSource, InMemoryRegistry};
    use cobol_lsp_core::{ErrorKind, Position};

    fn preprocessor(registry: InMemoryRegistry) -> GrammarPreprocessor {
        let resolver = CopybookResolver::new(Arc::new(registry), Arc::new(CopybookCache::new()));
        GrammarPreprocessor::new(resolver, ReplacingService::new(), SourceFormat::Free)
    }

    fn expand(registry: InMemoryRegistry, text: &str) -> ExtendedDocument {
        let document = DocumentMap::from_text("main".into(), text, SourceFormat::Free).result;
        let mut hierarchy = CopybookHierarchy::new(10);
        let doc = preprocessor(registry)
            .build_extended_document(
                document,
                &CopybookConfig::default(),
                &mut hierarchy,
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(hierarchy.is_empty());
        doc
    }

    #[test]
    fn test_no_directives_is_identity() {
        let text = "01 X.\r\n    05 Y PIC 9.\n";
        let doc = expand(InMemoryRegistry::new(), text);
        assert_eq!(doc.text(), text);
        assert!(doc.diagnostics().is_empty());
        assert!(doc.tokens().iter().all(|t| !t.locality.is_from_copybook()));
    }

    #[test]
    fn test_copy_splices_copybook() {
        let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
        let doc = expand(registry, "01 X.\n    COPY ABC.\n");
        assert_eq!(doc.text(), "01 X.\n05 Y PIC X.\n");
        assert!(doc.diagnostics().is_empty());

        let five = doc.tokens().iter().find(|t| t.text == "05").unwrap();
        assert_eq!(five.locality.uri(), "ABC");
        assert_eq!(five.locality.start(), Position::new(1, 1));
        assert_eq!(five.locality.copybook_names(), vec!["ABC"]);
        assert_eq!(five.locality.chain()[0].call_site.start(), Position::new(2, 5));

        assert_eq!(doc.copybooks().len(), 1);
        assert_eq!(doc.copybooks()[0].uri.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_copybook_trailing_newline_dropped() {
        let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.\n");
        let doc = expand(registry, "COPY ABC.\n01 Z.\n");
        assert_eq!(doc.text(), "05 Y PIC X.\n01 Z.\n");
    }

    #[test]
    fn test_missing_copybook_placeholder() {
        let doc = expand(InMemoryRegistry::new(), "01 A.\nCOPY MISSING.\n01 B.\n");
        assert_eq!(doc.text(), "01 A.\n\n01 B.\n");
        assert_eq!(doc.diagnostics().len(), 1);
        assert_eq!(doc.diagnostics()[0].kind, ErrorKind::CopybookNotFound);

        let placeholder = doc
            .tokens()
            .iter()
            .find(|t| t.kind == TokenKind::Placeholder)
            .unwrap();
        assert_eq!(placeholder.locality.start(), Position::new(2, 1));
        let b = doc.tokens().iter().find(|t| t.text == "B").unwrap();
        assert_eq!(b.locality.start(), Position::new(3, 4));
    }

    #[test]
    fn test_copy_replacing() {
        let registry = InMemoryRegistry::new().with("REC", "01 :P:-REC.\n   05 :P:-ID PIC 9.");
        let doc = expand(registry, "COPY REC REPLACING ==:P:== BY ==CUST==.\n");
        assert_eq!(doc.text(), "01 CUST-REC.\n   05 CUST-ID PIC 9.\n");
        let id = doc.tokens().iter().find(|t| t.text == "CUST-ID").unwrap();
        assert_eq!(id.locality.uri(), "REC");
        assert_eq!(id.locality.start(), Position::new(2, 7));
    }

    #[test]
    fn test_replace_applies_after_expansion() {
        let registry = InMemoryRegistry::new().with("ABC", "05 OLD-NAME PIC X.");
        let doc = expand(
            registry,
            "REPLACE ==OLD-NAME== BY ==NEW-NAME==.\nCOPY ABC.\nREPLACE OFF.\n05 OLD-NAME PIC 9.\n",
        );
        assert_eq!(doc.text(), "\n05 NEW-NAME PIC X.\n\n05 OLD-NAME PIC 9.\n");
        assert!(doc
            .tokens()
            .iter()
            .all(|t| !matches!(t.kind, TokenKind::ReplaceBoundary(_))));
    }

    #[test]
    fn test_replace_also_and_last_off() {
        let doc = expand(
            InMemoryRegistry::new(),
            "REPLACE ==A== BY ==X==.\nREPLACE ALSO ==B== BY ==Y==.\nA B\nREPLACE LAST OFF.\nA B\n",
        );
        assert_eq!(doc.text(), "\n\nX Y\n\nX B\n");
    }

    #[test]
    fn test_nested_copy_replacing_innermost_first() {
        let registry = InMemoryRegistry::new()
            .with("OUTER", "COPY INNER REPLACING ==A== BY ==B==.")
            .with("INNER", "01 A.");
        let doc = expand(registry, "COPY OUTER REPLACING ==B== BY ==C==.\n");
        assert_eq!(doc.text(), "01 C.\n");
    }

    #[test]
    fn test_nested_chain() {
        let registry = InMemoryRegistry::new()
            .with("OUTER", "01 O.\nCOPY INNER.")
            .with("INNER", "05 I PIC X.");
        let doc = expand(registry, "COPY OUTER.\n");
        let inner = doc.tokens().iter().find(|t| t.text == "I").unwrap();
        assert_eq!(inner.locality.copybook_names(), vec!["OUTER", "INNER"]);
        assert_eq!(inner.locality.chain()[0].call_site.uri(), "main");
        assert_eq!(inner.locality.chain()[1].call_site.uri(), "OUTER");
        assert_eq!(inner.locality.chain()[1].call_site.start(), Position::new(2, 1));
    }

    #[test]
    fn test_self_inclusion() {
        let registry = InMemoryRegistry::new().with("SELF", "01 S.\nCOPY SELF.");
        let doc = expand(registry, "COPY SELF.\n01 AFTER.\n");
        let circular: Vec<_> = doc
            .diagnostics()
            .iter()
            .filter(|d| d.kind == ErrorKind::CircularDependency)
            .collect();
        assert_eq!(circular.len(), 1);
        assert_eq!(circular[0].message, "SELF: Circular dependency detected (SELF -> SELF)");
        assert_eq!(circular[0].locality.uri(), "SELF");
        assert_eq!(doc.text(), "01 S.\n\n01 AFTER.\n");
    }

    #[test]
    fn test_depth_limit() {
        let registry = InMemoryRegistry::new()
            .with("A", "COPY B.")
            .with("B", "COPY C.")
            .with("C", "01 C.");
        let document = DocumentMap::from_text("main".into(), "COPY A.\n", SourceFormat::Free).result;
        let mut hierarchy = CopybookHierarchy::new(2);
        let doc = preprocessor(registry)
            .build_extended_document(
                document,
                &CopybookConfig::default(),
                &mut hierarchy,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(doc.diagnostics().len(), 1);
        assert_eq!(doc.diagnostics()[0].kind, ErrorKind::MaxDepthExceeded);
        assert!(hierarchy.is_empty());
    }

    #[test]
    fn test_malformed_replace_degrades() {
        let doc = expand(InMemoryRegistry::new(), "REPLACE ==A== ==B==.\n01 A.\n");
        assert_eq!(doc.diagnostics()[0].kind, ErrorKind::ReplaceClauseError);
        assert_eq!(doc.text(), "\n01 A.\n");
    }

    #[test]
    fn test_cancelled_before_start() {
        let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
        let document = DocumentMap::from_text("main".into(), "COPY ABC.\n", SourceFormat::Free).result;
        let mut hierarchy = CopybookHierarchy::new(10);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = preprocessor(registry)
            .build_extended_document(document, &CopybookConfig::default(), &mut hierarchy, &cancel)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled { .. }));
        assert!(hierarchy.is_empty());
    }

    /// Cancels the analysis when a given copybook is looked up.
    #[derive(Debug)]
    struct CancellingRegistry {
        inner: InMemoryRegistry,
        trigger: &'static str,
        cancel: CancellationToken,
        lookups: std::sync::Mutex<Vec<String>>,
    }

    impl CopybookRegistry for CancellingRegistry {
        fn lookup(&self, name: &str, config: &CopybookConfig) -> Option<CopybookSource> {
            self.lookups.lock().unwrap().push(name.to_string());
            if name == self.trigger {
                self.cancel.cancel();
            }
            self.inner.lookup(name, config)
        }
    }

    #[test]
    fn test_cancelled_inside_nested_copybooks() {
        let cancel = CancellationToken::new();
        let registry = Arc::new(CancellingRegistry {
            inner: InMemoryRegistry::new()
                .with("A", "01 A.\nCOPY B.\n")
                .with("B", "05 B.\nCOPY C.\n")
                .with("C", "10 C PIC X.\n"),
            trigger: "C",
            cancel: cancel.clone(),
            lookups: std::sync::Mutex::new(Vec::new()),
        });
        let resolver = CopybookResolver::new(registry.clone(), Arc::new(CopybookCache::new()));
        let preprocessor =
            GrammarPreprocessor::new(resolver, ReplacingService::new(), SourceFormat::Free);
        let document =
            DocumentMap::from_text("main".into(), "COPY A.\n01 AFTER.\n", SourceFormat::Free).result;
        let mut hierarchy = CopybookHierarchy::new(10);

        let err = preprocessor
            .build_extended_document(document, &CopybookConfig::default(), &mut hierarchy, &cancel)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled { ref uri } if uri == "main"));
        assert!(hierarchy.is_empty());
        assert_eq!(*registry.lookups.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_library_qualifier_does_not_change_lookup() {
        let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
        let doc = expand(registry, "01 X.\n    COPY ABC OF LIB1 SUPPRESS.\n");
        assert!(doc.diagnostics().is_empty());
        assert_eq!(doc.text(), "01 X.\n05 Y PIC X.\n");
        assert_eq!(doc.copybooks()[0].name, "ABC");
    }

    #[test]
    fn test_disabled_mode_never_touches_the_hierarchy() {
        let registry = InMemoryRegistry::new().with("A", "01 A.");
        let document = DocumentMap::from_text("main".into(), "COPY A.\nCOPY A.\n", SourceFormat::Free).result;
        let mut hierarchy = CopybookHierarchy::new(0);
        let doc = preprocessor(registry)
            .build_extended_document(
                document,
                &CopybookConfig::new(CopybookProcessingMode::Disabled),
                &mut hierarchy,
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(doc.diagnostics().is_empty());
        assert_eq!(doc.text(), "\n\n");
        assert_eq!(doc.copybooks().len(), 2);
        assert!(hierarchy.is_empty());
    }

    #[test]
    fn test_trim_indentation_only_at_line_start() {
        let mut tokens = crate::lexer::scan("01 X.  ", "main".into(), SourceFormat::Free).result;
        let before = tokens.len();
        trim_indentation(&mut tokens);
        assert_eq!(tokens.len(), before);

        let mut tokens = crate::lexer::scan("01 X.\n   ", "main".into(), SourceFormat::Free).result;
        trim_indentation(&mut tokens);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Newline);
    }
}
