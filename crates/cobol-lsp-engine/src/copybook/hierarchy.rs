//! Stack of active copybook inclusions.

use std::collections::HashSet;
use std::sync::Arc;

use cobol_lsp_core::{InclusionChain, InclusionFrame, Locality};
use tracing::trace;

use crate::error::HierarchyError;

/// One active inclusion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyFrame {
    /// Upper-cased copybook name.
    pub name: String,
    /// Locality of the inclusion directive.
    pub call_site: Locality,
    /// Nesting depth of this frame (1 for a copybook included from the
    /// top-level document).
    pub depth: usize,
}

/// The copybooks currently being expanded, outermost first.
///
/// A name never appears twice on the stack and the stack never grows past
/// `max_depth`. Every successful [`push`](Self::push) must be matched by
/// exactly one [`pop`](Self::pop).
#[derive(Debug, Clone)]
pub struct CopybookHierarchy {
    frames: Vec<HierarchyFrame>,
    active: HashSet<String>,
    chain: InclusionChain,
    max_depth: usize,
}

impl CopybookHierarchy {
    /// Create an empty hierarchy.
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            active: HashSet::new(),
            chain: Arc::from(Vec::new()),
            max_depth,
        }
    }

    /// Enter a copybook.
    pub fn push(&mut self, name: &str, call_site: Locality) -> Result<HierarchyFrame, HierarchyError> {
        let name = name.to_ascii_uppercase();

        if self.active.contains(&name) {
            let mut path: Vec<&str> = self.frames.iter().map(|f| f.name.as_str()).collect();
            path.push(&name);
            return Err(HierarchyError::CircularDependency {
                path: path.join(" -> "),
                name,
            });
        }

        let depth = self.frames.len() + 1;
        if depth > self.max_depth {
            return Err(HierarchyError::MaxDepthExceeded {
                name,
                max_depth: self.max_depth,
            });
        }

        let frame = HierarchyFrame {
            name: name.clone(),
            call_site,
            depth,
        };
        trace!(copybook = %name, depth, "hierarchy push");
        self.active.insert(name);
        self.frames.push(frame.clone());
        self.rebuild_chain();
        Ok(frame)
    }

    /// Leave the innermost copybook.
    pub fn pop(&mut self) -> Option<HierarchyFrame> {
        let frame = self.frames.pop()?;
        trace!(copybook = %frame.name, depth = frame.depth, "hierarchy pop");
        self.active.remove(&frame.name);
        self.rebuild_chain();
        Some(frame)
    }

    /// Pop every frame.
    pub fn unwind(&mut self) {
        while self.pop().is_some() {}
    }

    /// The active inclusion chain, outermost first.
    pub fn current_chain(&self) -> InclusionChain {
        Arc::clone(&self.chain)
    }

    /// Active frames, outermost first.
    pub fn frames(&self) -> &[HierarchyFrame] {
        &self.frames
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Configured depth limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Whether a copybook is active.
    pub fn contains(&self, name: &str) -> bool {
        self.active.contains(&name.to_ascii_uppercase())
    }

    /// Whether no copybook is active.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn rebuild_chain(&mut self) {
        self.chain = self
            .frames
            .iter()
            .map(|f| InclusionFrame {
                copybook: f.name.clone(),
                call_site: f.call_site.clone(),
            })
            .collect();
    }
}
