//! Column (box) selection.
//!
//! A [`ColumnSelection`] spans a rectangle of lines and columns between a fixed anchor and a
//! moving active corner. Columns may run past the end of short lines. The host keeps it while
//! the user drags, reads its text or highlight spans, and finally turns it into one cursor per
//! line with [`ColumnSelection::place_cursors`].

use crate::buffer::{EditError, Position, TextBuffer};
use crate::search::MatchSpan;

/// Normalized bounds of a column selection. Lines are inclusive, `end_column` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRange {
    /// Topmost line.
    pub start_line: usize,
    /// Bottom line (inclusive).
    pub end_line: usize,
    /// Left column.
    pub start_column: usize,
    /// Right column.
    pub end_column: usize,
}

/// A rectangular selection between two corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelection {
    anchor: Position,
    active: Position,
}

impl ColumnSelection {
    /// Start a selection with both corners at `anchor`.
    pub fn new(anchor: Position) -> Self {
        Self {
            anchor,
            active: anchor,
        }
    }

    /// Move the active corner.
    pub fn extend_to(&mut self, active: Position) {
        self.active = active;
    }

    /// The fixed corner.
    pub fn anchor(&self) -> Position {
        self.anchor
    }

    /// The moving corner.
    pub fn active(&self) -> Position {
        self.active
    }

    /// Bounds with the corners sorted.
    pub fn range(&self) -> ColumnRange {
        ColumnRange {
            start_line: self.anchor.line.min(self.active.line),
            end_line: self.anchor.line.max(self.active.line),
            start_column: self.anchor.column.min(self.active.column),
            end_column: self.anchor.column.max(self.active.column),
        }
    }

    /// Text inside the rectangle, one entry per existing line. Lines shorter than the left
    /// column give an empty string.
    pub fn selected_text(&self, buffer: &TextBuffer) -> Vec<String> {
        let range = self.range();
        self.lines(buffer)
            .filter_map(|line| buffer.line(line))
            .map(|text| {
                text.chars()
                    .skip(range.start_column)
                    .take(range.end_column - range.start_column)
                    .collect()
            })
            .collect()
    }

    /// Non-empty per-line pieces of the rectangle, clamped to each line, for highlighting.
    pub fn spans(&self, buffer: &TextBuffer) -> Vec<MatchSpan> {
        let range = self.range();
        self.lines(buffer)
            .filter_map(|line| {
                let len = buffer.line_len(line)?;
                let start = range.start_column.min(len);
                let end = range.end_column.min(len);
                (start < end).then(|| {
                    MatchSpan::new(Position::new(line, start), Position::new(line, end))
                })
            })
            .collect()
    }

    /// Replace the buffer's cursors with one per selected line, at the right column clamped to
    /// the line. The top line gets the primary cursor. Returns the number of cursors.
    pub fn place_cursors(&self, buffer: &mut TextBuffer) -> Result<usize, EditError> {
        let range = self.range();
        if range.start_line >= buffer.line_count() {
            return Err(EditError::InvalidPosition {
                line: range.start_line,
                column: range.start_column,
            });
        }

        let targets: Vec<Position> = self
            .lines(buffer)
            .map(|line| {
                let len = buffer.line_len(line).unwrap_or(0);
                Position::new(line, range.end_column.min(len))
            })
            .collect();

        buffer.clear_secondary_cursors();
        let mut placed = 0;
        for (index, pos) in targets.into_iter().enumerate() {
            if index == 0 {
                buffer.set_cursor(pos)?;
                placed += 1;
            } else if buffer.add_cursor(pos)? {
                placed += 1;
            }
        }
        log::debug!("column selection placed {placed} cursor(s)");
        Ok(placed)
    }

    /// Selected lines that exist in `buffer`.
    fn lines(&self, buffer: &TextBuffer) -> std::ops::RangeInclusive<usize> {
        let range = self.range();
        let last = buffer.line_count().saturating_sub(1);
        range.start_line..=range.end_line.min(last)
    }
}
