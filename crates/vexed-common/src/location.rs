use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Half-open byte range into a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The span as a `usize` range, clamped to `len` and widened to at least
    /// one byte so renderers always have something to underline.
    pub fn to_range(self, len: usize) -> std::ops::Range<usize> {
        let start = (self.start as usize).min(len);
        let end = (self.end as usize).min(len).max(start);
        if start == end {
            start..(end + 1).min(len)
        } else {
            start..end
        }
    }
}

/// Where a diagnostic points: an optional file plus a span within it.
///
/// Lowering attaches one of these to every checked site. Synthesized sites
/// (built-in declarations, test fixtures) use [`Location::detached`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub file: Option<Arc<str>>,
    pub span: Span,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, span: Span) -> Self {
        Location {
            file: Some(file.into()),
            span,
        }
    }

    pub fn detached(span: Span) -> Self {
        Location { file: None, span }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}..{}", file, self.span.start, self.span.end),
            None => write!(f, "{}..{}", self.span.start, self.span.end),
        }
    }
}

/// Line start offsets of a source text, for turning byte offsets into
/// 1-based line/column pairs.
#[derive(Debug)]
pub struct LineIndex {
    starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(
                source
                    .bytes()
                    .enumerate()
                    .filter(|&(_, b)| b == b'\n')
                    .map(|(i, _)| (i + 1) as u32),
            )
            .collect();
        LineIndex { starts }
    }

    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        (line as u32 + 1, offset - self.starts[line] + 1)
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}
