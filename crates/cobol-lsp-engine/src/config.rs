//! Analysis configuration: copybook processing mode, dialect, SQL backend,
//! nesting limits and copybook search folders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::lexer::SourceFormat;

/// How COPY directives are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CopybookProcessingMode {
    /// Resolve and expand copybooks; report missing ones as errors.
    #[default]
    Enabled,
    /// Inclusion is a deliberate no-op.
    Disabled,
    /// Resolve and expand copybooks; report missing ones as warnings.
    CompileOnly,
}

/// SQL backend the program targets. Decides which predefined SQL copybooks
/// are available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SqlBackend {
    /// IBM Db2.
    #[default]
    Db2Server,
    /// CA Datacom.
    DatacomServer,
}

/// Per-analysis copybook settings. Read-only once an analysis starts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CopybookConfig {
    /// Processing mode.
    #[serde(default)]
    pub mode: CopybookProcessingMode,
    /// Target dialect name; selects dialect-specific copybook folders.
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// Target SQL backend.
    #[serde(default)]
    pub sql_backend: SqlBackend,
}

impl Default for CopybookConfig {
    fn default() -> Self {
        Self {
            mode: CopybookProcessingMode::default(),
            dialect: default_dialect(),
            sql_backend: SqlBackend::default(),
        }
    }
}

impl CopybookConfig {
    /// Create a config with the given mode and default dialect/backend.
    pub fn new(mode: CopybookProcessingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.dialect = dialect.into();
        self
    }

    /// Set the SQL backend.
    pub fn with_sql_backend(mut self, backend: SqlBackend) -> Self {
        self.sql_backend = backend;
        self
    }
}

/// Copybook folders of one dialect, by folder kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopybookPaths {
    /// Local workspace folders.
    #[serde(default)]
    pub local: Vec<PathBuf>,
    /// Folders holding copybooks downloaded from data sets.
    #[serde(default)]
    pub dsn: Vec<PathBuf>,
    /// Folders holding copybooks downloaded from USS.
    #[serde(default)]
    pub uss: Vec<PathBuf>,
}

impl CopybookPaths {
    /// Whether no folder of any kind is configured.
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.dsn.is_empty() && self.uss.is_empty()
    }
}

/// Where the filesystem registry looks for copybooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Local workspace folders used for dialects without their own entry.
    #[serde(default)]
    pub local: Vec<PathBuf>,
    /// Downloaded data set folders used for dialects without their own entry.
    #[serde(default)]
    pub dsn: Vec<PathBuf>,
    /// Downloaded USS folders used for dialects without their own entry.
    #[serde(default)]
    pub uss: Vec<PathBuf>,
    /// Dialect-specific folders, keyed by dialect name.
    #[serde(default)]
    pub dialects: HashMap<String, CopybookPaths>,
    /// File extensions tried in local folders, in order.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            local: Vec::new(),
            dsn: Vec::new(),
            uss: Vec::new(),
            dialects: HashMap::new(),
            extensions: default_extensions(),
        }
    }
}

impl RegistrySettings {
    /// Folders searched for `dialect`: its own entry if configured, the
    /// default folders otherwise.
    pub fn paths_for(&self, dialect: &str) -> CopybookPaths {
        self.dialects
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(dialect))
            .map(|(_, paths)| paths.clone())
            .unwrap_or_else(|| CopybookPaths {
                local: self.local.clone(),
                dsn: self.dsn.clone(),
                uss: self.uss.clone(),
            })
    }
}

/// Top-level analysis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Maximum copybook nesting depth.
    #[serde(default = "default_max_depth")]
    pub max_copybook_depth: usize,
    /// Reference format of the source text.
    #[serde(default)]
    pub source_format: SourceFormat,
    /// Default copybook settings for analyses that do not pass their own.
    #[serde(default)]
    pub copybook: CopybookConfig,
    /// Filesystem registry settings.
    #[serde(default)]
    pub registry: RegistrySettings,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_copybook_depth: default_max_depth(),
            source_format: SourceFormat::default(),
            copybook: CopybookConfig::default(),
            registry: RegistrySettings::default(),
        }
    }
}

impl AnalysisSettings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AnalysisError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).map_err(|e| AnalysisError::Config {
            message: e.to_string(),
        })?;
        if settings.max_copybook_depth == 0 {
            return Err(AnalysisError::Config {
                message: "max_copybook_depth must be at least 1".to_string(),
            });
        }
        Ok(settings)
    }
}

fn default_dialect() -> String {
    "COBOL".to_string()
}

fn default_max_depth() -> usize {
    10
}

fn default_extensions() -> Vec<String> {
    vec![
        String::new(),
        ".cpy".to_string(),
        ".copy".to_string(),
        ".cbl".to_string(),
        ".cob".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = AnalysisSettings::default();
        assert_eq!(s.max_copybook_depth, 10);
        assert_eq!(s.source_format, SourceFormat::Free);
        assert_eq!(s.copybook.mode, CopybookProcessingMode::Enabled);
        assert_eq!(s.copybook.dialect, "COBOL");
        assert_eq!(s.copybook.sql_backend, SqlBackend::Db2Server);
        assert!(s.registry.paths_for("COBOL").is_empty());
        assert!(s.registry.extensions.contains(&".cpy".to_string()));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let s = AnalysisSettings::from_toml_str("").unwrap();
        assert_eq!(s, AnalysisSettings::default());
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            max_copybook_depth = 4
            source_format = "fixed"

            [copybook]
            mode = "compile-only"
            dialect = "IDMS"
            sql_backend = "datacom-server"

            [registry]
            local = ["copybooks"]
            dsn = ["downloads/dsn"]
            extensions = [".cpy"]

            [registry.dialects.IDMS]
            local = ["idms"]
        "#;
        let s = AnalysisSettings::from_toml_str(toml).unwrap();
        assert_eq!(s.max_copybook_depth, 4);
        assert_eq!(s.source_format, SourceFormat::Fixed);
        assert_eq!(s.copybook.mode, CopybookProcessingMode::CompileOnly);
        assert_eq!(s.copybook.dialect, "IDMS");
        assert_eq!(s.copybook.sql_backend, SqlBackend::DatacomServer);
        assert_eq!(s.registry.local, vec![PathBuf::from("copybooks")]);
        assert_eq!(s.registry.dsn, vec![PathBuf::from("downloads/dsn")]);
        assert_eq!(s.registry.extensions, vec![".cpy".to_string()]);
        assert_eq!(s.registry.paths_for("idms").local, vec![PathBuf::from("idms")]);
        assert_eq!(s.registry.paths_for("COBOL").local, vec![PathBuf::from("copybooks")]);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = AnalysisSettings::from_toml_str("max_copybook_depth = 0").unwrap_err();
        assert!(matches!(err, AnalysisError::Config { .. }));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let err = AnalysisSettings::from_toml_str("[copybook]\nmode = \"sometimes\"").unwrap_err();
        assert!(matches!(err, AnalysisError::Config { .. }));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        std::fs::write(&path, "max_copybook_depth = 7\n").unwrap();
        let s = AnalysisSettings::from_file(&path).unwrap();
        assert_eq!(s.max_copybook_depth, 7);

        let missing = AnalysisSettings::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(AnalysisError::Config { .. })));
    }
}
