//! Source positions of IR entities.

/// A span of source text, as byte offsets.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where an operation, block or region came from.
///
/// Parsed IR records the span of the operation's text. IR built in code
/// uses [`Location::default`], an empty span at offset 0.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Location {
    pub span: Span,
}

impl Location {
    pub const fn new(span: Span) -> Self {
        Self { span }
    }

    /// Byte offset of the first character.
    pub const fn offset(&self) -> usize {
        self.span.start
    }
}
