//! Copybook inclusion support: the active-inclusion stack, text lookup,
//! the shared resolution cache and the resolver tying them together.

pub mod cache;
pub mod hierarchy;
pub mod predefined;
pub mod registry;
pub mod resolver;

pub use cache::CopybookCache;
pub use hierarchy::{CopybookHierarchy, HierarchyFrame};
pub use registry::{CopybookRegistry, CopybookSource, FileSystemRegistry, InMemoryRegistry};
pub use resolver::{CopybookResolver, ResolvedCopybook};
