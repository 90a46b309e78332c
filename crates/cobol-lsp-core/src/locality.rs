//! Source provenance tracking.
//!
//! Every token and tree node carries a [`Locality`]: the file it physically
//! came from, its line/column range in that file, and the chain of copybook
//! inclusions that brought it into the analyzed document. Editors use the
//! chain to land diagnostics and navigation on the right file even after
//! several layers of expansion.

use std::fmt;
use std::sync::Arc;

/// A line/column position (both 1-indexed, columns count characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of positions (`end` is exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
    /// First position covered.
    pub start: Position,
    /// Position just past the last covered character.
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create an empty range at a position.
    pub fn point(pos: Position) -> Self {
        Self::new(pos, pos)
    }

    /// Whether the range covers no characters.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `pos` lies inside the range.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }
}

/// One active copybook inclusion: the copybook name and where it was
/// included from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InclusionFrame {
    /// Copybook name as written in the directive (upper-cased).
    pub copybook: String,
    /// Locality of the inclusion directive.
    pub call_site: Locality,
}

/// Ordered inclusion frames, outermost first.
pub type InclusionChain = Arc<[InclusionFrame]>;

/// Provenance of a span of text.
///
/// Immutable once produced. Equality and ordering compare the file, then the
/// range, then the inclusion chain, which gives a stable order for sorting
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Locality {
    uri: Arc<str>,
    range: Range,
    chain: InclusionChain,
}

impl Locality {
    /// Create a locality in a top-level document (empty inclusion chain).
    pub fn new(uri: impl Into<Arc<str>>, range: Range) -> Self {
        Self {
            uri: uri.into(),
            range,
            chain: Arc::from(Vec::new()),
        }
    }

    /// Create a zero-width locality at a position.
    pub fn point(uri: impl Into<Arc<str>>, pos: Position) -> Self {
        Self::new(uri, Range::point(pos))
    }

    /// Return a copy of this locality stamped with an inclusion chain.
    pub fn with_chain(mut self, chain: InclusionChain) -> Self {
        self.chain = chain;
        self
    }

    /// The file this text physically lives in.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Shared handle to the file identifier.
    pub fn shared_uri(&self) -> Arc<str> {
        Arc::clone(&self.uri)
    }

    /// The covered range.
    pub fn range(&self) -> Range {
        self.range
    }

    /// Start position.
    pub fn start(&self) -> Position {
        self.range.start
    }

    /// End position (exclusive).
    pub fn end(&self) -> Position {
        self.range.end
    }

    /// Inclusion chain, outermost call site first.
    pub fn chain(&self) -> &InclusionChain {
        &self.chain
    }

    /// Whether this text arrived through copybook expansion.
    pub fn is_from_copybook(&self) -> bool {
        !self.chain.is_empty()
    }

    /// Copybook names of the inclusion chain, outermost first.
    pub fn copybook_names(&self) -> Vec<&str> {
        self.chain.iter().map(|f| f.copybook.as_str()).collect()
    }

    /// The locality in the top-level document that ultimately produced this
    /// text: the outermost call site for expanded text, or `self` otherwise.
    pub fn root_locality(&self) -> &Locality {
        match self.chain.first() {
            Some(frame) => &frame.call_site,
            None => self,
        }
    }

    /// A zero-width locality at the start of this one.
    pub fn start_point(&self) -> Self {
        Self {
            uri: Arc::clone(&self.uri),
            range: Range::point(self.range.start),
            chain: Arc::clone(&self.chain),
        }
    }

    /// Span from the start of `self` to the end of `other`.
    ///
    /// Both must come from the same file through the same chain; otherwise
    /// `self` is returned unchanged.
    pub fn to(&self, other: &Locality) -> Self {
        if self.uri != other.uri || self.chain != other.chain || other.range.end < self.range.start
        {
            return self.clone();
        }
        Self {
            uri: Arc::clone(&self.uri),
            range: Range::new(self.range.start, other.range.end),
            chain: Arc::clone(&self.chain),
        }
    }
}

impl fmt::Display for Locality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uri, self.range.start)?;
        for frame in self.chain.iter().rev() {
            write!(
                f,
                " (copied from {} at {}:{})",
                frame.copybook,
                frame.call_site.uri,
                frame.call_site.range.start
            )?;
        }
        Ok(())
    }
}
