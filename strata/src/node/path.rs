//! Paths addressing nodes inside a document tree.

use std::fmt;

/// One step of a [`NodePath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

/// Location of a node relative to its document root.
///
/// Rendered as `a.b[0].c`; the empty path renders as `<root>`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<Segment>);

impl NodePath {
    /// The document root.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from segments.
    #[must_use]
    pub const fn from_segments(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    /// Parse a dotted path such as `a.b[0].c`.
    ///
    /// Returns `None` for empty keys or malformed indices.
    #[must_use]
    pub fn parse_dotted(text: &str) -> Option<Self> {
        let mut segments = Vec::new();
        if text.is_empty() {
            return Some(Self::root());
        }
        for part in text.split('.') {
            let (key, mut rest) = part.find('[').map_or((part, ""), |at| part.split_at(at));
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_owned()));
            } else if rest.is_empty() {
                return None;
            }
            while let Some(open) = rest.strip_prefix('[') {
                let close = open.find(']')?;
                let (digits, tail) = open.split_at(close);
                segments.push(Segment::Index(digits.parse().ok()?));
                rest = tail.strip_prefix(']')?;
            }
            if !rest.is_empty() {
                return None;
            }
        }
        Some(Self(segments))
    }

    /// Segments from the root down.
    #[must_use]
    pub const fn segments(&self) -> &[Segment] {
        self.0.as_slice()
    }

    /// Number of segments.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Path extended by a mapping key.
    #[must_use]
    pub fn key(&self, key: &str) -> Self {
        self.child(Segment::Key(key.to_owned()))
    }

    /// Path extended by a sequence index.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    /// The first `len` segments of this path.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0.iter().take(len).cloned().collect())
    }

    /// The enclosing path, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let len = self.0.len().checked_sub(1)?;
        Some(self.prefix(len))
    }

    /// Returns `true` when `self` equals `other` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.0.starts_with(&other.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if position == 0 => f.write_str(key)?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromIterator<Segment> for NodePath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
