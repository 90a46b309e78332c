//! Copybook text lookup.
//!
//! The registry is the only place copybook text physically comes from. The
//! resolver consults it through [`CopybookRegistry`] and caches the answers.

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{CopybookConfig, RegistrySettings};
use crate::error::{AnalysisError, Result};

/// Text of one copybook and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopybookSource {
    /// Identifier used as the file of every token scanned from `text`.
    pub uri: Arc<str>,
    /// Raw copybook text.
    pub text: String,
}

impl CopybookSource {
    /// Create a source.
    pub fn new(uri: impl Into<Arc<str>>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            text: text.into(),
        }
    }
}

/// Looks up copybook text by name.
///
/// Lookups are synchronous and must not have side effects the caller can
/// observe, so answers can be cached.
pub trait CopybookRegistry: Send + Sync + fmt::Debug {
    /// Find the copybook `name` for the given configuration.
    fn lookup(&self, name: &str, config: &CopybookConfig) -> Option<CopybookSource>;
}

/// A registry backed by a name-to-text map. Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    entries: HashMap<String, String>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a copybook.
    pub fn insert(&mut self, name: &str, text: impl Into<String>) {
        self.entries.insert(name.to_ascii_uppercase(), text.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: &str, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }

    /// Number of copybooks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CopybookRegistry for InMemoryRegistry {
    fn lookup(&self, name: &str, _config: &CopybookConfig) -> Option<CopybookSource> {
        let key = name.to_ascii_uppercase();
        self.entries
            .get(&key)
            .map(|text| CopybookSource::new(key.as_str(), text.clone()))
    }
}

/// A registry that searches copybook folders on disk.
///
/// Folders are searched in priority order: local workspace folders, trying
/// every configured extension, then folders of copybooks downloaded from
/// data sets, then folders downloaded from USS. Downloaded copybooks are
/// stored without an extension.
#[derive(Debug, Clone)]
pub struct FileSystemRegistry {
    settings: RegistrySettings,
}

impl FileSystemRegistry {
    /// Create a registry, checking that every configured folder that exists
    /// is a directory. Missing folders are skipped at lookup time.
    pub fn new(settings: RegistrySettings) -> Result<Self> {
        let all_paths = settings
            .local
            .iter()
            .chain(&settings.dsn)
            .chain(&settings.uss)
            .chain(settings.dialects.values().flat_map(|p| {
                p.local.iter().chain(&p.dsn).chain(&p.uss)
            }));
        for path in all_paths {
            if path.exists() && !path.is_dir() {
                return Err(AnalysisError::Config {
                    message: format!("copybook folder {} is not a directory", path.display()),
                });
            }
            if !path.exists() {
                debug!(folder = %path.display(), "copybook folder does not exist yet");
            }
        }
        Ok(Self { settings })
    }

    /// The settings this registry searches with.
    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    fn candidates(&self, name: &str, dialect: &str) -> Vec<PathBuf> {
        let paths = self.settings.paths_for(dialect);
        let mut names = vec![name.to_string()];
        for variant in [name.to_ascii_uppercase(), name.to_ascii_lowercase()] {
            if !names.contains(&variant) {
                names.push(variant);
            }
        }

        let mut candidates = Vec::new();
        for folder in &paths.local {
            for stem in &names {
                for ext in &self.settings.extensions {
                    candidates.push(folder.join(format!("{stem}{ext}")));
                }
            }
        }
        for folder in paths.dsn.iter().chain(&paths.uss) {
            for stem in &names {
                candidates.push(folder.join(stem));
            }
        }
        candidates
    }
}

impl CopybookRegistry for FileSystemRegistry {
    fn lookup(&self, name: &str, config: &CopybookConfig) -> Option<CopybookSource> {
        self.candidates(name, &config.dialect)
            .into_iter()
            .find_map(|path| read_copybook(&path))
    }
}

fn read_copybook(path: &Path) -> Option<CopybookSource> {
    if !path.is_file() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), "copybook found");
            Some(CopybookSource::new(path.display().to_string(), text))
        }
        Err(e) if e.kind() == IoErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "copybook unreadable");
            None
        }
    }
}
