//! Copybook name resolution.

use std::sync::Arc;

use cobol_lsp_core::{Diagnostic, ErrorKind, Locality, ResultWithErrors, Severity};
use tracing::debug;

use crate::config::{CopybookConfig, CopybookProcessingMode};
use crate::copybook::cache::CopybookCache;
use crate::copybook::predefined;
use crate::copybook::registry::{CopybookRegistry, CopybookSource};

/// Outcome of resolving one copybook name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCopybook {
    /// Upper-cased name.
    pub name: String,
    /// The copybook text, or `None` when the inclusion becomes a placeholder.
    pub source: Option<Arc<CopybookSource>>,
}

impl ResolvedCopybook {
    /// Whether the inclusion becomes a placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.source.is_none()
    }
}

/// Maps copybook names to their text through the registry and the shared
/// cache.
#[derive(Debug, Clone)]
pub struct CopybookResolver {
    registry: Arc<dyn CopybookRegistry>,
    cache: Arc<CopybookCache>,
}

impl CopybookResolver {
    /// Create a resolver.
    pub fn new(registry: Arc<dyn CopybookRegistry>, cache: Arc<CopybookCache>) -> Self {
        Self { registry, cache }
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<CopybookCache> {
        &self.cache
    }

    /// Resolve `name` for an inclusion at `call_site`.
    ///
    /// With copybook processing disabled the result is a placeholder and no
    /// diagnostic. A name neither the registry nor the predefined SQL
    /// copybooks know yields a placeholder and a `CopybookNotFound`
    /// diagnostic, a warning in compile-only mode.
    pub fn resolve(
        &self,
        name: &str,
        call_site: &Locality,
        config: &CopybookConfig,
    ) -> ResultWithErrors<ResolvedCopybook> {
        let upper = name.to_ascii_uppercase();
        if config.mode == CopybookProcessingMode::Disabled {
            debug!(copybook = %upper, "copybook processing disabled");
            return ResultWithErrors::of(ResolvedCopybook {
                name: upper,
                source: None,
            });
        }

        let source = self.cache.get_or_resolve(&upper, config, || {
            self.registry
                .lookup(&upper, config)
                .or_else(|| predefined::lookup(&upper, config.sql_backend))
        });

        let resolved = ResolvedCopybook {
            name: upper.clone(),
            source,
        };
        if !resolved.is_placeholder() {
            return ResultWithErrors::of(resolved);
        }

        let severity = match config.mode {
            CopybookProcessingMode::CompileOnly => Severity::Warning,
            _ => Severity::Error,
        };
        let diagnostic = Diagnostic::new(
            ErrorKind::CopybookNotFound,
            severity,
            format!("{upper}: Copybook not found"),
            call_site.clone(),
        )
        .with_suggestion(format!(
            "add {upper} to a copybook folder configured for dialect {}",
            config.dialect
        ));
        ResultWithErrors::new(resolved, vec![diagnostic])
    }
}
