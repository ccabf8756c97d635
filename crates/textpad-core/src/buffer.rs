//! Editable text state for one open document.
//!
//! A [`TextBuffer`] owns the text (stored in a [`ropey::Rope`]), the cursor and optional
//! selection, any secondary cursors, the modified flag, the encoding and line ending retained
//! from disk, and a bounded undo/redo history.
//!
//! Secondary cursors follow every edit. [`TextBuffer::insert_at_cursors`] and
//! [`TextBuffer::delete_at_cursors`] edit at all cursors in one sweep, recorded as one undo step.
//!
//! Positions are `(line, column)` pairs with columns counted in `char`s. Every public operation
//! validates its positions and fails with [`EditError::InvalidPosition`] instead of clamping, so
//! the cursor and selection always point into the current text.
//!
//! # Example
//!
//! ```rust
//! use textpad_core::{Position, TextBuffer};
//!
//! let mut buffer = TextBuffer::new("hello");
//! let end = buffer.insert(Position::new(0, 5), ", world").unwrap();
//! assert_eq!(buffer.text(), "hello, world");
//! assert_eq!(end, Position::new(0, 12));
//! assert!(buffer.is_modified());
//!
//! buffer.undo().unwrap();
//! assert_eq!(buffer.text(), "hello");
//! ```

use crate::config::EditorConfig;
use crate::history::{CursorSnapshot, TextEdit, UndoRedoManager, UndoStep};
use crate::io::{DocumentIo, FileIoError, LoadedText};
use crate::line_ending::{LineEnding, normalize_line_endings};
use crate::pairs::is_word_char;
use encoding_rs::{Encoding, UTF_8};
use ropey::Rope;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::atomic::{self, AtomicU64};
use thiserror::Error;
use unicode_segmentation::UnicodeSegmentation;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Position coordinates (line and column numbers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    /// Zero-based line index.
    pub line: usize,
    /// Zero-based column in characters within the line.
    pub column: usize,
}

impl Position {
    /// Create a new position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Selection direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionDirection {
    /// The active end is `end`.
    Forward,
    /// The active end is `start`.
    Backward,
}

/// Selection range, always stored with `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selection start position
    pub start: Position,
    /// Selection end position
    pub end: Position,
    /// Selection direction
    pub direction: SelectionDirection,
}

impl Selection {
    /// Build a selection from the fixed `anchor` to the moving `active` end.
    pub fn new(anchor: Position, active: Position) -> Self {
        if anchor <= active {
            Self {
                start: anchor,
                end: active,
                direction: SelectionDirection::Forward,
            }
        } else {
            Self {
                start: active,
                end: anchor,
                direction: SelectionDirection::Backward,
            }
        }
    }

    /// The end the cursor sits on.
    pub fn active(&self) -> Position {
        match self.direction {
            SelectionDirection::Forward => self.end,
            SelectionDirection::Backward => self.start,
        }
    }

    /// Returns `true` if the selection covers no text.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Errors raised by buffer edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// A position outside the current text was passed in.
    #[error("invalid position: line {line}, column {column}")]
    InvalidPosition {
        /// Line index.
        line: usize,
        /// Column in characters.
        column: usize,
    },
    /// A range whose start comes after its end.
    #[error("invalid range: {start:?} is after {end:?}")]
    InvalidRange {
        /// Range start.
        start: Position,
        /// Range end.
        end: Position,
    },
    /// The undo history is empty.
    #[error("nothing to undo")]
    NothingToUndo,
    /// The redo history is empty.
    #[error("nothing to redo")]
    NothingToRedo,
}

/// Which side of each cursor [`TextBuffer::delete_at_cursors`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDirection {
    /// The grapheme cluster before the cursor (Backspace).
    Backward,
    /// The grapheme cluster after the cursor (Delete).
    Forward,
}

/// A replacement in character offsets of the text *before* any edit of the batch is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OffsetEdit {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) text: String,
}

struct CursorEdit {
    start: usize,
    end: usize,
    text: String,
    primary: bool,
}

/// Editable text of one open document.
#[derive(Debug)]
pub struct TextBuffer {
    instance: u64,
    path: Option<PathBuf>,
    rope: Rope,
    cursor: Position,
    selection: Option<Selection>,
    secondary_cursors: Vec<Position>,
    modified: bool,
    encoding: &'static Encoding,
    line_ending: LineEnding,
    tab_width: usize,
    history: UndoRedoManager,
    revision: u64,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl TextBuffer {
    /// Create an untitled buffer with default settings.
    pub fn new(text: &str) -> Self {
        Self::with_config(text, &EditorConfig::default())
    }

    /// Create an untitled buffer using `config` for tab width and history bound.
    pub fn with_config(text: &str, config: &EditorConfig) -> Self {
        let config = config.clone().normalized();
        Self {
            instance: NEXT_INSTANCE.fetch_add(1, atomic::Ordering::Relaxed),
            path: None,
            rope: Rope::from_str(&normalize_line_endings(text)),
            cursor: Position::default(),
            selection: None,
            secondary_cursors: Vec::new(),
            modified: false,
            encoding: UTF_8,
            line_ending: LineEnding::detect_in_text(text),
            tab_width: config.tab_width,
            history: UndoRedoManager::new(config.undo_limit),
            revision: 0,
        }
    }

    /// Create a buffer from text decoded by the file I/O collaborator.
    pub fn from_loaded(
        path: impl Into<PathBuf>,
        loaded: LoadedText,
        config: &EditorConfig,
    ) -> Self {
        let mut buffer = Self::with_config(&loaded.text, config);
        buffer.path = Some(path.into());
        buffer.encoding = loaded.encoding;
        buffer.line_ending = loaded.line_ending;
        buffer
    }

    /// Load `path` through `io`. The new buffer is unmodified and keeps the detected encoding.
    pub fn load(
        path: impl AsRef<Path>,
        io: &dyn DocumentIo,
        config: &EditorConfig,
    ) -> Result<Self, FileIoError> {
        let path = path.as_ref();
        let loaded = io.load(path)?;
        Ok(Self::from_loaded(path, loaded, config))
    }

    /// Write the buffer to its path with the retained encoding, then clear the modified flag.
    pub fn save(&mut self, io: &dyn DocumentIo) -> Result<(), FileIoError> {
        let path = self.path.clone().ok_or(FileIoError::Untitled)?;
        io.save(&path, &self.text(), self.encoding, self.line_ending)?;
        self.set_modified(false);
        Ok(())
    }

    /// Write the buffer to `path`, adopting it as the buffer's identity.
    pub fn save_as(
        &mut self,
        path: impl Into<PathBuf>,
        io: &dyn DocumentIo,
    ) -> Result<(), FileIoError> {
        let path = path.into();
        io.save(&path, &self.text(), self.encoding, self.line_ending)?;
        self.path = Some(path);
        self.set_modified(false);
        Ok(())
    }

    /// File path, or `None` for an untitled buffer.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Name shown in tabs and result summaries.
    pub fn display_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    }

    /// Whole text (LF line endings).
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Number of lines. `N` newlines make `N + 1` lines.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Total number of characters.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Text of `line` without its newline.
    pub fn line(&self, line: usize) -> Option<String> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let mut text = self.rope.line(line).to_string();
        if text.ends_with('\n') {
            text.pop();
        }
        Some(text)
    }

    /// Length of `line` in characters, excluding its newline.
    pub fn line_len(&self, line: usize) -> Option<usize> {
        if line >= self.rope.len_lines() {
            return None;
        }
        let slice = self.rope.line(line);
        let len = slice.len_chars();
        if len > 0 && slice.char(len - 1) == '\n' {
            Some(len - 1)
        } else {
            Some(len)
        }
    }

    /// Leading spaces and tabs of `line`.
    pub fn leading_whitespace(&self, line: usize) -> Option<String> {
        self.line(line).map(|text| {
            text.chars()
                .take_while(|ch| *ch == ' ' || *ch == '\t')
                .collect()
        })
    }

    /// Convert a position to a character offset, failing if it is out of bounds.
    pub fn char_offset(&self, pos: Position) -> Result<usize, EditError> {
        let invalid = EditError::InvalidPosition {
            line: pos.line,
            column: pos.column,
        };
        let line_len = self.line_len(pos.line).ok_or(invalid.clone())?;
        if pos.column > line_len {
            return Err(invalid);
        }
        Ok(self.rope.line_to_char(pos.line) + pos.column)
    }

    /// Convert a character offset (clamped to the text length) to a position.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = self.rope.char_to_line(offset);
        Position::new(line, offset - self.rope.line_to_char(line))
    }

    /// Character starting at `pos` (`'\n'` at the end of a non-final line).
    pub fn char_at(&self, pos: Position) -> Option<char> {
        let offset = self.char_offset(pos).ok()?;
        self.rope.get_char(offset)
    }

    /// Character immediately before `pos`.
    pub fn char_before(&self, pos: Position) -> Option<char> {
        let offset = self.char_offset(pos).ok()?;
        offset.checked_sub(1).and_then(|prev| self.rope.get_char(prev))
    }

    pub(crate) fn rope(&self) -> &Rope {
        &self.rope
    }

    /// Text between two offsets.
    pub(crate) fn slice_text(&self, start: usize, end: usize) -> String {
        self.rope.slice(start..end).to_string()
    }

    /// Current cursor position.
    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Move the cursor and drop the selection.
    pub fn set_cursor(&mut self, pos: Position) -> Result<(), EditError> {
        self.char_offset(pos)?;
        self.cursor = pos;
        self.selection = None;
        self.normalize_secondary();
        self.bump_revision();
        Ok(())
    }

    /// Current selection, if any.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Select from `anchor` to `active`; the cursor moves to `active`.
    ///
    /// An empty range clears the selection.
    pub fn set_selection(&mut self, anchor: Position, active: Position) -> Result<(), EditError> {
        self.char_offset(anchor)?;
        self.char_offset(active)?;
        self.cursor = active;
        self.selection = (anchor != active).then(|| Selection::new(anchor, active));
        self.normalize_secondary();
        self.bump_revision();
        Ok(())
    }

    /// Select the whole text, cursor at the end.
    pub fn select_all(&mut self) {
        let end = self.position_at(self.rope.len_chars());
        self.cursor = end;
        self.selection =
            (end != Position::default()).then(|| Selection::new(Position::default(), end));
        self.normalize_secondary();
        self.bump_revision();
    }

    /// Select the cursor's line without its newline, cursor at the line end.
    pub fn select_line(&mut self) {
        let line = self.cursor.line;
        let len = self.line_len(line).unwrap_or(0);
        let (start, end) = (Position::new(line, 0), Position::new(line, len));
        self.cursor = end;
        self.selection = (len > 0).then(|| Selection::new(start, end));
        self.normalize_secondary();
        self.bump_revision();
    }

    /// Select the word touching the cursor. Returns `false`, leaving the state alone, when no
    /// word character is adjacent.
    pub fn select_word(&mut self) -> bool {
        let line: Vec<char> = self
            .line(self.cursor.line)
            .unwrap_or_default()
            .chars()
            .collect();
        let column = self.cursor.column.min(line.len());
        let mut start = column;
        while start > 0 && is_word_char(line[start - 1]) {
            start -= 1;
        }
        let mut end = column;
        while end < line.len() && is_word_char(line[end]) {
            end += 1;
        }
        if start == end {
            return false;
        }

        let line = self.cursor.line;
        self.cursor = Position::new(line, end);
        self.selection = Some(Selection::new(
            Position::new(line, start),
            Position::new(line, end),
        ));
        self.normalize_secondary();
        self.bump_revision();
        true
    }

    /// Extra cursors, in document order. Never includes the primary cursor.
    pub fn secondary_cursors(&self) -> &[Position] {
        &self.secondary_cursors
    }

    /// Returns `true` if edits apply at more than one cursor.
    pub fn has_secondary_cursors(&self) -> bool {
        !self.secondary_cursors.is_empty()
    }

    /// Every cursor, primary first.
    pub fn cursors(&self) -> Vec<Position> {
        std::iter::once(self.cursor)
            .chain(self.secondary_cursors.iter().copied())
            .collect()
    }

    /// Add a secondary cursor at `pos`. Returns `false` if a cursor is already there.
    pub fn add_cursor(&mut self, pos: Position) -> Result<bool, EditError> {
        self.char_offset(pos)?;
        if pos == self.cursor || self.secondary_cursors.contains(&pos) {
            return Ok(false);
        }
        self.secondary_cursors.push(pos);
        self.secondary_cursors.sort();
        self.bump_revision();
        Ok(true)
    }

    /// Drop every secondary cursor.
    pub fn clear_secondary_cursors(&mut self) {
        if !self.secondary_cursors.is_empty() {
            self.secondary_cursors.clear();
            self.bump_revision();
        }
    }

    /// Add a cursor on the line above each cursor, column clamped to that line. Returns how many
    /// were added.
    pub fn add_cursor_above(&mut self) -> usize {
        let targets: Vec<Position> = self
            .cursors()
            .into_iter()
            .filter_map(|pos| {
                pos.line
                    .checked_sub(1)
                    .map(|line| self.clamped(line, pos.column))
            })
            .collect();
        self.add_cursors(targets)
    }

    /// Add a cursor on the line below each cursor, column clamped to that line. Returns how many
    /// were added.
    pub fn add_cursor_below(&mut self) -> usize {
        let last_line = self.line_count() - 1;
        let targets: Vec<Position> = self
            .cursors()
            .into_iter()
            .filter(|pos| pos.line < last_line)
            .map(|pos| self.clamped(pos.line + 1, pos.column))
            .collect();
        self.add_cursors(targets)
    }

    /// Drop the selection, keeping the cursor where it is.
    pub fn clear_selection(&mut self) {
        if self.selection.take().is_some() {
            self.bump_revision();
        }
    }

    /// Text covered by the selection.
    pub fn selected_text(&self) -> Option<String> {
        let selection = self.selection.as_ref()?;
        let start = self.char_offset(selection.start).ok()?;
        let end = self.char_offset(selection.end).ok()?;
        Some(self.slice_text(start, end))
    }

    /// Insert `text` at `pos` and move the cursor to the end of the inserted text.
    ///
    /// Returns that end position. Embedded CRLF/CR are normalized to LF.
    pub fn insert(&mut self, pos: Position, text: &str) -> Result<Position, EditError> {
        let offset = self.char_offset(pos)?;
        if text.is_empty() {
            self.set_cursor(pos)?;
            return Ok(pos);
        }
        Ok(self.record_edit(offset, offset, text, None))
    }

    /// Remove the text between `start` and `end` and return it.
    ///
    /// `start == end` is a no-op that leaves the modified flag untouched.
    pub fn delete_range(&mut self, start: Position, end: Position) -> Result<String, EditError> {
        let (start_offset, end_offset) = self.range_offsets(start, end)?;
        if start_offset == end_offset {
            return Ok(String::new());
        }
        let deleted = self.slice_text(start_offset, end_offset);
        self.record_edit(start_offset, end_offset, "", None);
        Ok(deleted)
    }

    /// Replace the text between `start` and `end` with `text` as a single undo step.
    ///
    /// Returns the end position of the inserted text, where the cursor is placed.
    pub fn replace_range(
        &mut self,
        start: Position,
        end: Position,
        text: &str,
    ) -> Result<Position, EditError> {
        let (start_offset, end_offset) = self.range_offsets(start, end)?;
        if start_offset == end_offset && text.is_empty() {
            self.set_cursor(start)?;
            return Ok(start);
        }
        Ok(self.record_edit(start_offset, end_offset, text, None))
    }

    /// Like [`TextBuffer::replace_range`], but leaves the cursor `caret` characters into the
    /// inserted text. Undo and redo restore that cursor too.
    pub fn replace_range_with_caret(
        &mut self,
        start: Position,
        end: Position,
        text: &str,
        caret: usize,
    ) -> Result<Position, EditError> {
        let (start_offset, end_offset) = self.range_offsets(start, end)?;
        if start_offset == end_offset && text.is_empty() {
            self.set_cursor(start)?;
            return Ok(start);
        }
        Ok(self.record_edit(start_offset, end_offset, text, Some(caret)))
    }

    /// Insert `text` at every cursor in one sweep, replacing the selection at the primary cursor.
    ///
    /// Each cursor ends after its inserted text. Secondary cursors inside the selection are
    /// dropped. The whole edit is one undo step. Returns the primary cursor.
    pub fn insert_at_cursors(&mut self, text: &str) -> Position {
        let (start, end) = self.primary_range();
        let mut edits = vec![CursorEdit {
            start,
            end,
            text: text.to_string(),
            primary: true,
        }];
        for offset in self.secondary_offsets() {
            if start < end && (start..=end).contains(&offset) {
                continue;
            }
            edits.push(CursorEdit {
                start: offset,
                end: offset,
                text: text.to_string(),
                primary: false,
            });
        }
        self.record_batch(edits)
    }

    /// Delete the selection at the primary cursor, or one grapheme cluster next to it, and one
    /// cluster next to every secondary cursor, in one sweep.
    ///
    /// Backward deletion at a line start joins it with the previous line. The whole edit is one
    /// undo step. Returns the primary cursor.
    pub fn delete_at_cursors(&mut self, direction: DeleteDirection) -> Position {
        let (start, end) = self.primary_range();
        let primary = if start < end {
            (start, end)
        } else {
            self.cluster_range(self.cursor, direction)
        };
        let mut edits = vec![CursorEdit {
            start: primary.0,
            end: primary.1,
            text: String::new(),
            primary: true,
        }];
        for pos in self.secondary_cursors.clone() {
            let Ok(offset) = self.char_offset(pos) else {
                continue;
            };
            if start < end && (start..=end).contains(&offset) {
                continue;
            }
            let (edit_start, edit_end) = self.cluster_range(pos, direction);
            edits.push(CursorEdit {
                start: edit_start,
                end: edit_end,
                text: String::new(),
                primary: false,
            });
        }
        self.record_batch(edits)
    }

    /// Revert the most recent recorded edit, restoring its content and cursor.
    pub fn undo(&mut self) -> Result<(), EditError> {
        let step = self.history.pop_undo().ok_or(EditError::NothingToUndo)?;
        let edit = &step.edit;
        self.rope.remove(edit.start..edit.start + edit.inserted_len());
        self.rope.insert(edit.start, &edit.deleted_text);
        self.restore(&step.before);
        self.modified = true;
        self.history.push_redo(step);
        Ok(())
    }

    /// Re-apply the most recently undone edit.
    pub fn redo(&mut self) -> Result<(), EditError> {
        let step = self.history.pop_redo().ok_or(EditError::NothingToRedo)?;
        let edit = &step.edit;
        self.rope.remove(edit.start..edit.start + edit.deleted_len());
        self.rope.insert(edit.start, &edit.inserted_text);
        self.restore(&step.after);
        self.modified = true;
        self.history.push_undone(step);
        Ok(())
    }

    /// Returns `true` if there is an edit to undo.
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Returns `true` if there is an edit to redo.
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of recorded undo steps.
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    /// Number of undone steps available for redo.
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    /// Change the bound on recorded undo steps.
    pub fn set_undo_limit(&mut self, limit: usize) {
        self.history.set_limit(limit);
    }

    /// Whether the content changed since load or the last save.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Set or clear the modified flag (cleared by the host after a successful save).
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Encoding used when saving.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Override the encoding used when saving.
    pub fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = encoding;
    }

    /// Line ending used when saving.
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Override the line ending used when saving.
    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    /// Characters per indent level.
    pub fn tab_width(&self) -> usize {
        self.tab_width
    }

    /// Set characters per indent level (minimum 1).
    pub fn set_tab_width(&mut self, width: usize) {
        self.tab_width = width.max(1);
    }

    /// Counter bumped on every content, cursor or selection change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply ascending, non-overlapping `edits` in one sweep without recording history.
    ///
    /// Recorded steps no longer describe the text afterwards, so both undo and redo history are
    /// cleared. The cursor keeps its place relative to the surrounding text; a cursor inside a
    /// replaced range lands after the replacement.
    pub(crate) fn apply_unrecorded(&mut self, edits: &[OffsetEdit]) {
        if edits.is_empty() {
            return;
        }

        let ranges: Vec<(usize, usize, usize)> = edits
            .iter()
            .map(|edit| (edit.start, edit.end, edit.text.chars().count()))
            .collect();
        let cursor = map_offset(self.char_offset(self.cursor).unwrap_or(0), &ranges);
        let secondary: Vec<usize> = self
            .secondary_offsets()
            .into_iter()
            .map(|offset| map_offset(offset, &ranges))
            .collect();

        let mut delta: isize = 0;
        for edit in edits {
            let start = edit.start.saturating_add_signed(delta);
            let deleted = edit.end - edit.start;
            self.rope.remove(start..start + deleted);
            self.rope.insert(start, &edit.text);
            delta += edit.text.chars().count() as isize - deleted as isize;
        }

        if self.history.can_undo() || self.history.can_redo() {
            log::debug!(
                "{}: history cleared by unrecorded replacement",
                self.display_name()
            );
        }
        self.history.clear();
        self.cursor = self.position_at(cursor);
        self.selection = None;
        self.set_secondary_offsets(secondary);
        self.modified = true;
        self.bump_revision();
    }

    /// Identity unique to this buffer within the process.
    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    fn range_offsets(&self, start: Position, end: Position) -> Result<(usize, usize), EditError> {
        let start_offset = self.char_offset(start)?;
        let end_offset = self.char_offset(end)?;
        if start_offset > end_offset {
            return Err(EditError::InvalidRange { start, end });
        }
        Ok((start_offset, end_offset))
    }

    fn record_edit(
        &mut self,
        start: usize,
        end: usize,
        text: &str,
        caret: Option<usize>,
    ) -> Position {
        let inserted_text = normalize_line_endings(text);
        let before = self.snapshot();
        let deleted_text = self.slice_text(start, end);
        let inserted_len = inserted_text.chars().count();
        let secondary: Vec<usize> = self
            .secondary_offsets()
            .into_iter()
            .map(|offset| map_offset(offset, &[(start, end, inserted_len)]))
            .collect();

        self.rope.remove(start..end);
        self.rope.insert(start, &inserted_text);

        let caret = caret.map_or(inserted_len, |caret| caret.min(inserted_len));
        self.cursor = self.position_at(start + caret);
        self.selection = None;
        self.set_secondary_offsets(secondary);
        self.modified = true;
        self.bump_revision();

        let after = self.snapshot();
        self.history.push_step(UndoStep {
            edit: TextEdit {
                start,
                deleted_text,
                inserted_text,
            },
            before,
            after,
        });
        self.cursor
    }

    /// Apply cursor edits as one recorded step: the span from the first edit to the last is
    /// replaced in a single rope operation.
    fn record_batch(&mut self, mut edits: Vec<CursorEdit>) -> Position {
        edits.sort_by_key(|edit| (edit.start, edit.end));
        let mut previous_end = 0;
        for edit in &mut edits {
            edit.start = edit.start.max(previous_end);
            edit.end = edit.end.max(edit.start);
            previous_end = edit.end;
        }
        if edits
            .iter()
            .all(|edit| edit.start == edit.end && edit.text.is_empty())
        {
            return self.cursor;
        }
        let (Some(first), Some(last)) = (edits.first(), edits.last()) else {
            return self.cursor;
        };
        let (region_start, region_end) = (first.start, last.end);

        let before = self.snapshot();
        let deleted_text = self.slice_text(region_start, region_end);
        let mut inserted_text = String::new();
        let mut inserted_len = 0;
        let mut primary = region_start;
        let mut secondary = Vec::with_capacity(edits.len());
        let mut gap_start = region_start;
        for edit in &edits {
            let gap = self.slice_text(gap_start, edit.start);
            let text = normalize_line_endings(&edit.text);
            inserted_len += gap.chars().count() + text.chars().count();
            inserted_text.push_str(&gap);
            inserted_text.push_str(&text);

            let caret = region_start + inserted_len;
            if edit.primary {
                primary = caret;
            } else {
                secondary.push(caret);
            }
            gap_start = edit.end;
        }

        self.rope.remove(region_start..region_end);
        self.rope.insert(region_start, &inserted_text);

        self.cursor = self.position_at(primary);
        self.selection = None;
        self.set_secondary_offsets(secondary);
        self.modified = true;
        self.bump_revision();

        let after = self.snapshot();
        self.history.push_step(UndoStep {
            edit: TextEdit {
                start: region_start,
                deleted_text,
                inserted_text,
            },
            before,
            after,
        });
        self.cursor
    }

    /// Offsets of the primary selection, or the cursor twice.
    fn primary_range(&self) -> (usize, usize) {
        let cursor = self.char_offset(self.cursor).unwrap_or(0);
        self.selection
            .as_ref()
            .and_then(|selection| {
                let start = self.char_offset(selection.start).ok()?;
                let end = self.char_offset(selection.end).ok()?;
                Some((start, end))
            })
            .unwrap_or((cursor, cursor))
    }

    /// Offsets of the grapheme cluster next to `pos`, or an empty range at the text edges.
    fn cluster_range(&self, pos: Position, direction: DeleteDirection) -> (usize, usize) {
        let offset = self.char_offset(pos).unwrap_or(0);
        let line = self.line(pos.line).unwrap_or_default();
        let column = pos.column.min(line.chars().count());
        let split = line
            .char_indices()
            .nth(column)
            .map_or(line.len(), |(byte, _)| byte);
        match direction {
            DeleteDirection::Backward => {
                let len = match line[..split].graphemes(true).next_back() {
                    Some(cluster) => cluster.chars().count(),
                    None => usize::from(offset > 0),
                };
                (offset - len, offset)
            }
            DeleteDirection::Forward => {
                let len = match line[split..].graphemes(true).next() {
                    Some(cluster) => cluster.chars().count(),
                    None => usize::from(offset < self.rope.len_chars()),
                };
                (offset, offset + len)
            }
        }
    }

    fn clamped(&self, line: usize, column: usize) -> Position {
        Position::new(line, column.min(self.line_len(line).unwrap_or(0)))
    }

    fn add_cursors(&mut self, targets: Vec<Position>) -> usize {
        let mut added = 0;
        for pos in targets {
            if let Ok(true) = self.add_cursor(pos) {
                added += 1;
            }
        }
        added
    }

    fn secondary_offsets(&self) -> Vec<usize> {
        self.secondary_cursors
            .iter()
            .filter_map(|pos| self.char_offset(*pos).ok())
            .collect()
    }

    fn set_secondary_offsets(&mut self, offsets: Vec<usize>) {
        self.secondary_cursors = offsets
            .into_iter()
            .map(|offset| self.position_at(offset))
            .collect();
        self.normalize_secondary();
    }

    /// Sorted, no duplicates, never on the primary cursor.
    fn normalize_secondary(&mut self) {
        let primary = self.cursor;
        self.secondary_cursors.retain(|pos| *pos != primary);
        self.secondary_cursors.sort();
        self.secondary_cursors.dedup();
    }

    fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            cursor: self.cursor,
            selection: self.selection.clone(),
            secondary: self.secondary_cursors.clone(),
        }
    }

    fn restore(&mut self, snapshot: &CursorSnapshot) {
        self.cursor = snapshot.cursor;
        self.selection = snapshot.selection.clone();
        self.secondary_cursors = snapshot.secondary.clone();
        self.bump_revision();
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Where `offset` lands after ascending, non-overlapping `(start, end, inserted_len)` edits.
///
/// Offsets at or before an edit's start stay put; offsets inside a replaced range move to the
/// end of its replacement.
fn map_offset(offset: usize, edits: &[(usize, usize, usize)]) -> usize {
    let mut delta: isize = 0;
    for &(start, end, inserted) in edits {
        if offset <= start {
            break;
        }
        if offset < end {
            return start.saturating_add_signed(delta) + inserted;
        }
        delta += inserted as isize - (end - start) as isize;
    }
    offset.saturating_add_signed(delta)
}
