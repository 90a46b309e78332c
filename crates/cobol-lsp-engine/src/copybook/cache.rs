//! Shared copybook resolution cache.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, trace};

use crate::config::{CopybookConfig, SqlBackend};
use crate::copybook::registry::CopybookSource;

/// Cache key: dialect, SQL backend and copybook name (both upper-cased).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    dialect: String,
    backend: SqlBackend,
    name: String,
}

impl CacheKey {
    fn new(name: &str, config: &CopybookConfig) -> Self {
        Self {
            dialect: config.dialect.to_ascii_uppercase(),
            backend: config.sql_backend,
            name: name.to_ascii_uppercase(),
        }
    }
}

type Slot = Arc<OnceLock<Option<Arc<CopybookSource>>>>;

/// Resolution results shared by every analysis of a workspace.
///
/// Reads are concurrent. The first caller for a key runs the lookup; other
/// callers for the same key block on the same slot and reuse its answer, so
/// at most one registry lookup per key is ever in flight. Negative answers
/// are cached too, until [`invalidate`](Self::invalidate) or
/// [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct CopybookCache {
    entries: DashMap<CacheKey, Slot>,
}

impl CopybookCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached answer for `name`, running `resolve` if there is
    /// none yet.
    pub fn get_or_resolve<F>(
        &self,
        name: &str,
        config: &CopybookConfig,
        resolve: F,
    ) -> Option<Arc<CopybookSource>>
    where
        F: FnOnce() -> Option<CopybookSource>,
    {
        let key = CacheKey::new(name, config);
        // Clone the slot out so the shard lock is released before resolving.
        let slot: Slot = Arc::clone(self.entries.entry(key).or_default().value());

        let mut resolved_here = false;
        let answer = slot.get_or_init(|| {
            resolved_here = true;
            resolve().map(Arc::new)
        });

        if resolved_here {
            debug!(copybook = %name, found = answer.is_some(), "copybook cache miss");
        } else {
            trace!(copybook = %name, "copybook cache hit");
        }
        answer.clone()
    }

    /// Forget every cached answer for `name`, in all dialects and backends.
    pub fn invalidate(&self, name: &str) {
        let name = name.to_ascii_uppercase();
        self.entries.retain(|key, _| key.name != name);
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
