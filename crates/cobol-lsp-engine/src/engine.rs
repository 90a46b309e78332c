//! The analysis pipeline, wired together.
//!
//! [`AnalysisEngine`] owns the long-lived pieces (settings, registry and the
//! shared resolution cache) and builds the per-analysis ones for every
//! request: a fresh [`CopybookHierarchy`] and the stage objects threaded
//! through [`GrammarPreprocessor`] and [`SemanticParser`].

use std::path::Path;
use std::sync::Arc;

use cobol_lsp_core::{sort_diagnostics, Diagnostic, ResultWithErrors};
use tracing::info;

use crate::cancel::CancellationToken;
use crate::config::{AnalysisSettings, CopybookConfig};
use crate::copybook::{
    CopybookCache, CopybookHierarchy, CopybookRegistry, CopybookResolver, FileSystemRegistry,
};
use crate::document::{DocumentMap, ExtendedDocument};
use crate::error::{AnalysisError, Result};
use crate::preprocessor::{GrammarPreprocessor, ReplacingService};
use crate::semantic::{Node, SemanticParser};

/// Everything one analysis produces.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// The expanded document with its preprocessing diagnostics.
    pub document: ExtendedDocument,
    /// The semantic tree. Its diagnostics include the preprocessing ones.
    pub tree: ResultWithErrors<Node>,
}

impl AnalysisResult {
    /// All diagnostics, ordered by location.
    pub fn sorted_diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.tree.errors.clone();
        sort_diagnostics(&mut diagnostics);
        diagnostics
    }
}

/// Composition root of the analysis pipeline.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use cobol_lsp_engine::{
///     AnalysisEngine, AnalysisSettings, CancellationToken, CopybookConfig, InMemoryRegistry,
/// };
///
/// let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
/// let engine = AnalysisEngine::new(AnalysisSettings::default(), Arc::new(registry));
/// let result = engine
///     .analyze("main", "01 X.\n    COPY ABC.\n", &CopybookConfig::default(), &CancellationToken::new())
///     .unwrap();
/// assert_eq!(result.document.text(), "01 X.\n05 Y PIC X.\n");
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    settings: AnalysisSettings,
    registry: Arc<dyn CopybookRegistry>,
    cache: Arc<CopybookCache>,
}

impl AnalysisEngine {
    /// Create an engine with its own resolution cache.
    pub fn new(settings: AnalysisSettings, registry: Arc<dyn CopybookRegistry>) -> Self {
        Self {
            settings,
            registry,
            cache: Arc::new(CopybookCache::new()),
        }
    }

    /// Create an engine backed by a [`FileSystemRegistry`] over the folders
    /// named in `settings`.
    pub fn from_settings(settings: AnalysisSettings) -> Result<Self> {
        let registry = FileSystemRegistry::new(settings.registry.clone())?;
        Ok(Self::new(settings, Arc::new(registry)))
    }

    /// Share `cache` with other engines.
    pub fn with_cache(mut self, cache: Arc<CopybookCache>) -> Self {
        self.cache = cache;
        self
    }

    /// The settings this engine was built with.
    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// The resolution cache, e.g. to invalidate a copybook that changed.
    pub fn cache(&self) -> &Arc<CopybookCache> {
        &self.cache
    }

    /// Analyze `text`, identified by `uri`.
    ///
    /// Problems in the source are diagnostics in the result. Only
    /// cancellation fails the call.
    pub fn analyze(
        &self,
        uri: &str,
        text: &str,
        config: &CopybookConfig,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        info!(
            uri,
            mode = ?config.mode,
            dialect = %config.dialect,
            "analysis started"
        );

        let format = self.settings.source_format;
        let mut diagnostics = Vec::new();
        let document =
            DocumentMap::from_text(Arc::from(uri), text, format).accumulate_errors(&mut diagnostics);

        let resolver = CopybookResolver::new(Arc::clone(&self.registry), Arc::clone(&self.cache));
        let preprocessor = GrammarPreprocessor::new(resolver, ReplacingService::new(), format);
        let mut hierarchy = CopybookHierarchy::new(self.settings.max_copybook_depth);
        let expanded =
            preprocessor.build_extended_document(document, config, &mut hierarchy, cancel)?;

        // Scanner diagnostics of the top-level text precede everything else.
        let document = if diagnostics.is_empty() {
            expanded
        } else {
            diagnostics.extend_from_slice(expanded.diagnostics());
            ExtendedDocument::new(
                Arc::from(uri),
                expanded.tokens().to_vec(),
                expanded.copybooks().to_vec(),
                diagnostics,
            )
        };

        let tree = SemanticParser::new().parse(&document);
        info!(
            uri,
            tokens = document.tokens().len(),
            copybooks = document.copybooks().len(),
            diagnostics = tree.errors.len(),
            "analysis finished"
        );
        Ok(AnalysisResult { document, tree })
    }

    /// Analyze `text` with the copybook settings of [`AnalysisSettings`].
    pub fn analyze_default(
        &self,
        uri: &str,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        self.analyze(uri, text, &self.settings.copybook, cancel)
    }

    /// Read and analyze the file at `path`. The path is the document
    /// identifier.
    pub fn analyze_file(
        &self,
        path: &Path,
        config: &CopybookConfig,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.analyze(&path.display().to_string(), &text, config, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CopybookProcessingMode;
    use crate::copybook::InMemoryRegistry;
    use cobol_lsp_core::{ErrorKind, Position, Severity};

    fn engine(registry: InMemoryRegistry) -> AnalysisEngine {
        AnalysisEngine::new(AnalysisSettings::default(), Arc::new(registry))
    }

    #[test]
    fn test_empty_uri_is_analyzed() {
        let registry = InMemoryRegistry::new().with("ABC", "05 Y PIC X.");
        let result = engine(registry)
            .analyze(
                "",
                "ID DIVISION.\nPROGRAM-ID. P.\nDATA DIVISION.\nWORKING-STORAGE SECTION.\n01 X.\n    COPY ABC.\n",
                &CopybookConfig::default(),
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(result.tree.errors.is_empty(), "Errors: {:?}", result.tree.errors);
        assert_eq!(result.document.uri(), "");
        assert_eq!(result.tree.result.name(), Some("P"));
        let x = result
            .document
            .tokens()
            .iter()
            .find(|t| t.text == "X")
            .unwrap();
        assert_eq!(x.locality.uri(), "");
    }

    #[test]
    fn test_default_copybook_config_from_settings() {
        let settings = AnalysisSettings::from_toml_str("[copybook]\nmode = \"compile-only\"\n").unwrap();
        let engine = AnalysisEngine::new(settings, Arc::new(InMemoryRegistry::new()));
        let result = engine
            .analyze_default("main", "COPY MISSING.\n", &CancellationToken::new())
            .unwrap();
        assert_eq!(result.document.diagnostics()[0].kind, ErrorKind::CopybookNotFound);
        assert_eq!(result.document.diagnostics()[0].severity, Severity::Warning);

        let disabled = AnalysisSettings {
            copybook: CopybookConfig::new(CopybookProcessingMode::Disabled),
            ..AnalysisSettings::default()
        };
        let engine = AnalysisEngine::new(disabled, Arc::new(InMemoryRegistry::new()));
        let result = engine
            .analyze_default("main", "COPY MISSING.\n", &CancellationToken::new())
            .unwrap();
        assert!(result.document.diagnostics().is_empty());
    }

    #[test]
    fn test_copybook_nodes_keep_their_origin() {
        let registry = InMemoryRegistry::new().with("PARAS", "EXTRA-PARA.\n    EXIT.\n");
        let text = "ID DIVISION.\nPROGRAM-ID. P.\nPROCEDURE DIVISION.\nMAIN-PARA.\n    PERFORM EXTRA-PARA.\n    COPY PARAS.\n";
        let result = engine(registry)
            .analyze("main", text, &CopybookConfig::default(), &CancellationToken::new())
            .unwrap();
        assert!(result.tree.errors.is_empty(), "Errors: {:?}", result.tree.errors);

        let paragraphs = result
            .tree
            .result
            .find_all(|k| matches!(k, crate::semantic::NodeKind::Paragraph { .. }));
        assert_eq!(paragraphs.len(), 2);
        let extra = paragraphs[1];
        assert_eq!(extra.name(), Some("EXTRA-PARA"));
        assert_eq!(extra.locality.uri(), "PARAS");
        assert_eq!(extra.locality.start(), Position::new(1, 1));
        assert_eq!(extra.locality.copybook_names(), vec!["PARAS"]);
        assert_eq!(extra.locality.root_locality().start(), Position::new(6, 5));
    }

    #[test]
    fn test_sorted_diagnostics() {
        let text = "ID DIVISION.\nPROGRAM-ID. P.\nPROCEDURE DIVISION.\n    PERFORM NOWHERE.\n    COPY MISSING.\n";
        let result = engine(InMemoryRegistry::new())
            .analyze("main", text, &CopybookConfig::default(), &CancellationToken::new())
            .unwrap();
        // Copybook diagnostics are reported first, semantic ones later.
        assert_eq!(result.tree.errors[0].kind, ErrorKind::CopybookNotFound);

        let sorted = result.sorted_diagnostics();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].kind, ErrorKind::SemanticError);
        assert_eq!(sorted[0].locality.start().line, 4);
        assert_eq!(sorted[1].kind, ErrorKind::CopybookNotFound);
        assert_eq!(sorted[1].severity, Severity::Error);
    }

    #[test]
    fn test_scanner_diagnostics_are_kept() {
        let text = "ID DIVISION.\nPROGRAM-ID. P.\nPROCEDURE DIVISION.\n    DISPLAY \"OPEN.\n";
        let result = engine(InMemoryRegistry::new())
            .analyze("main", text, &CopybookConfig::default(), &CancellationToken::new())
            .unwrap();
        assert_eq!(result.document.diagnostics().len(), 1);
        assert_eq!(result.document.diagnostics()[0].message, "Unterminated literal");
        assert_eq!(result.document.text(), text);
    }

    #[test]
    fn test_shared_cache() {
        let cache = Arc::new(CopybookCache::new());
        let registry = Arc::new(InMemoryRegistry::new().with("ABC", "05 Y PIC X."));
        let first = AnalysisEngine::new(AnalysisSettings::default(), registry.clone())
            .with_cache(Arc::clone(&cache));
        let second =
            AnalysisEngine::new(AnalysisSettings::default(), registry).with_cache(Arc::clone(&cache));
        let config = CopybookConfig::default();
        let cancel = CancellationToken::new();
        first.analyze("a", "COPY ABC.\n", &config, &cancel).unwrap();
        second.analyze("b", "COPY ABC.\n", &config, &cancel).unwrap();
        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(first.cache(), second.cache()));
    }

    #[test]
    fn test_analyze_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = engine(InMemoryRegistry::new()).analyze_file(
            &dir.path().join("nope.cbl"),
            &CopybookConfig::default(),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(AnalysisError::Io { .. })));
    }
}
