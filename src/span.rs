use std::fmt::Display;

/// A line/column position in a source file, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

/// Represents a span in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Position of `start`
    pub pos: SourcePos,
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.pos.line, self.pos.column)
    }
}

impl Span {
    pub fn new(start: usize, end: usize, pos: SourcePos) -> Self {
        Self { start, end, pos }
    }

    pub fn line(&self) -> u32 {
        self.pos.line
    }

    /// Smallest span covering both `self` and `other`; keeps the earlier position.
    pub fn merge(self, other: Span) -> Span {
        let pos = if self.start <= other.start { self.pos } else { other.pos };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            pos,
        }
    }
}

/// A value with associated span information
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

/// Tracks line starts while a source is scanned front to back.
///
/// Offsets passed to `locate` must be non-decreasing.
#[derive(Debug, Clone)]
pub struct LineTracker<'src> {
    source: &'src str,
    scanned: usize,
    line: u32,
    line_start: usize,
}

impl<'src> LineTracker<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            scanned: 0,
            line: 1,
            line_start: 0,
        }
    }

    pub fn locate(&mut self, offset: usize) -> SourcePos {
        let offset = offset.min(self.source.len());
        if offset > self.scanned {
            for (i, b) in self.source.as_bytes()[self.scanned..offset].iter().enumerate() {
                if *b == b'\n' {
                    self.line += 1;
                    self.line_start = self.scanned + i + 1;
                }
            }
            self.scanned = offset;
        }
        let column = self.source[self.line_start..offset].chars().count() as u32 + 1;
        SourcePos {
            line: self.line,
            column,
        }
    }

    /// Text of the line containing the most recently located offset.
    pub fn current_line_text(&self) -> &'src str {
        let rest = &self.source[self.line_start..];
        rest.split('\n').next().unwrap_or("").trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_tracker_positions() {
        let source = "ab\ncd\n\nxyz";
        let mut tracker = LineTracker::new(source);
        assert_eq!(tracker.locate(0), SourcePos { line: 1, column: 1 });
        assert_eq!(tracker.locate(1), SourcePos { line: 1, column: 2 });
        assert_eq!(tracker.locate(4), SourcePos { line: 2, column: 2 });
        assert_eq!(tracker.current_line_text(), "cd");
        assert_eq!(tracker.locate(7), SourcePos { line: 4, column: 1 });
        assert_eq!(tracker.current_line_text(), "xyz");
    }

    #[test]
    fn test_merge_keeps_earliest_position() {
        let a = Span::new(4, 6, SourcePos { line: 1, column: 5 });
        let b = Span::new(10, 12, SourcePos { line: 2, column: 1 });
        let m = b.merge(a);
        assert_eq!((m.start, m.end), (4, 12));
        assert_eq!(m.pos.line, 1);
    }
}
