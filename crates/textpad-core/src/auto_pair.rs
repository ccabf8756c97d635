//! Structural edits applied on top of raw key input.
//!
//! The host routes every typed character, newline, backspace and paste through
//! [`AutoPairEngine::handle`] first. The engine either performs the edit itself and reports
//! [`InputOutcome::Handled`], or leaves the buffer untouched and reports
//! [`InputOutcome::PassThrough`], in which case the host applies the default edit
//! ([`apply_default`]). [`AutoPairEngine::dispatch`] does both steps.
//!
//! Handled cases:
//!
//! - **Pairing**: typing `(`, `[`, `{` inserts the closer too, cursor in between. Quotes pair
//!   only outside an open quoted span and not next to a word character.
//! - **Select-and-wrap**: typing an opener with a selection wraps the selection.
//! - **Type-through**: typing a closer that already sits at the cursor steps over it.
//! - **Bracket newline**: `{|}` + newline puts `}` on its own line and the cursor on an indented
//!   line in between.
//! - **Indent carry-forward**: a plain newline copies the line's indentation, one level deeper
//!   after a trailing opener or `:`.
//! - **Smart backspace**: removes one indent level of spaces at once, or an empty pair.
//! - **Dedent on close**: a closing bracket typed into pure indentation dedents the line.
//!
//! Every handled edit is a single undo step. Tab and Delete always pass through; the default
//! Tab inserts `tab_width` spaces. While the buffer has secondary cursors every event passes
//! through, and the default edit applies at all cursors at once.
//!
//! ```rust
//! use textpad_core::{AutoPairEngine, EditorConfig, InputEvent, Position, TextBuffer};
//!
//! let engine = AutoPairEngine::new(&EditorConfig::default());
//! let mut buffer = TextBuffer::new("");
//!
//! engine.dispatch(&mut buffer, &InputEvent::Char('(')).unwrap();
//! assert_eq!(buffer.text(), "()");
//! assert_eq!(buffer.cursor(), Position::new(0, 1));
//!
//! engine.dispatch(&mut buffer, &InputEvent::Char(')')).unwrap();
//! assert_eq!(buffer.text(), "()");
//! assert_eq!(buffer.cursor(), Position::new(0, 2));
//! ```

use crate::buffer::{DeleteDirection, EditError, Position, TextBuffer};
use crate::config::EditorConfig;
use crate::pairs::{is_close_bracket, is_open_bracket, is_quote, pair_for_open};

/// A raw input event from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A printable character was typed.
    Char(char),
    /// Enter/Return.
    Newline,
    /// Tab.
    Tab,
    /// Backspace.
    Backspace,
    /// Delete (forward).
    Delete,
    /// Clipboard paste.
    Paste(String),
}

/// What [`AutoPairEngine::handle`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum InputOutcome {
    /// The engine applied the edit; the host must not insert anything.
    Handled,
    /// The buffer is untouched; the host should apply the default edit.
    PassThrough,
}

/// Bracket/quote pairing and indentation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoPairEngine {
    auto_indent: bool,
    auto_pair: bool,
}

impl Default for AutoPairEngine {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}

impl AutoPairEngine {
    /// Create an engine from resolved settings. Tab width is read from each buffer.
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            auto_indent: config.auto_indent,
            auto_pair: config.auto_pair,
        }
    }

    /// Decide whether to handle `event`, applying the edit if so.
    pub fn handle(
        &self,
        buffer: &mut TextBuffer,
        event: &InputEvent,
    ) -> Result<InputOutcome, EditError> {
        if buffer.has_secondary_cursors() {
            return Ok(InputOutcome::PassThrough);
        }
        match event {
            InputEvent::Char(ch) => self.handle_char(buffer, *ch),
            InputEvent::Newline => self.handle_newline(buffer),
            InputEvent::Backspace => self.handle_backspace(buffer),
            InputEvent::Tab | InputEvent::Delete | InputEvent::Paste(_) => {
                Ok(InputOutcome::PassThrough)
            }
        }
    }

    /// [`AutoPairEngine::handle`], falling back to [`apply_default`].
    pub fn dispatch(&self, buffer: &mut TextBuffer, event: &InputEvent) -> Result<(), EditError> {
        match self.handle(buffer, event)? {
            InputOutcome::Handled => Ok(()),
            InputOutcome::PassThrough => apply_default(buffer, event),
        }
    }

    fn handle_char(&self, buffer: &mut TextBuffer, ch: char) -> Result<InputOutcome, EditError> {
        if let Some(selection) = buffer.selection().cloned() {
            let Some(pair) = pair_for_open(ch).filter(|_| self.auto_pair) else {
                return Ok(InputOutcome::PassThrough);
            };
            let selected = buffer.selected_text().unwrap_or_default();
            let wrapped = format!("{}{}{}", pair.open, selected, pair.close);
            buffer.replace_range(selection.start, selection.end, &wrapped)?;

            let inner_start = Position::new(selection.start.line, selection.start.column + 1);
            let inner_end = if selection.end.line == selection.start.line {
                Position::new(selection.end.line, selection.end.column + 1)
            } else {
                selection.end
            };
            buffer.set_selection(inner_start, inner_end)?;
            return Ok(InputOutcome::Handled);
        }

        let cursor = buffer.cursor();
        let next = buffer.char_at(cursor);
        let prev = buffer.char_before(cursor);

        if self.auto_pair && next == Some(ch) {
            let inside_quotes = is_quote(ch) && quote_is_open(buffer, cursor, ch);
            if is_close_bracket(ch) || inside_quotes {
                buffer.set_cursor(Position::new(cursor.line, cursor.column + 1))?;
                return Ok(InputOutcome::Handled);
            }
        }

        if self.auto_pair
            && let Some(pair) = pair_for_open(ch).filter(|pair| !pair.is_symmetric())
        {
            let text = format!("{}{}", pair.open, pair.close);
            buffer.replace_range_with_caret(cursor, cursor, &text, 1)?;
            return Ok(InputOutcome::Handled);
        }

        if self.auto_pair && is_quote(ch) {
            let closes_open_span = quote_is_open(buffer, cursor, ch);
            let word_before = prev.is_some_and(|c| c.is_alphanumeric() || c == '\\');
            let word_after = next.is_some_and(char::is_alphanumeric);
            if !closes_open_span && !word_before && !word_after {
                let text = format!("{ch}{ch}");
                buffer.replace_range_with_caret(cursor, cursor, &text, 1)?;
                return Ok(InputOutcome::Handled);
            }
        }

        if self.auto_indent && is_close_bracket(ch) && cursor.column > 0 {
            let line = buffer.line(cursor.line).unwrap_or_default();
            let prefix: String = line.chars().take(cursor.column).collect();
            if prefix.chars().all(|c| c == ' ' || c == '\t') {
                let dedented = dedent(&prefix, buffer.tab_width());
                let text = format!("{dedented}{ch}");
                buffer.replace_range(Position::new(cursor.line, 0), cursor, &text)?;
                return Ok(InputOutcome::Handled);
            }
        }

        Ok(InputOutcome::PassThrough)
    }

    fn handle_newline(&self, buffer: &mut TextBuffer) -> Result<InputOutcome, EditError> {
        if !self.auto_indent {
            return Ok(InputOutcome::PassThrough);
        }

        let (start, end) = match buffer.selection() {
            Some(selection) => (selection.start, selection.end),
            None => (buffer.cursor(), buffer.cursor()),
        };
        let line = buffer.line(start.line).unwrap_or_default();
        let leading: String = line
            .chars()
            .take(start.column)
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        let unit = indent_unit(&leading, buffer.tab_width());

        let before = buffer.char_before(start);
        let after = buffer.char_at(end);
        let between_pair = before
            .filter(|c| is_open_bracket(*c))
            .and_then(pair_for_open)
            .is_some_and(|pair| after == Some(pair.close));

        if between_pair {
            let inner = format!("{leading}{unit}");
            let text = format!("\n{inner}\n{leading}");
            let caret = 1 + inner.chars().count();
            buffer.replace_range_with_caret(start, end, &text, caret)?;
            return Ok(InputOutcome::Handled);
        }

        let head: String = line.chars().take(start.column).collect();
        let opens_block = head
            .trim_end()
            .chars()
            .last()
            .is_some_and(|c| is_open_bracket(c) || c == ':');
        let indent = if opens_block {
            format!("{leading}{unit}")
        } else {
            leading
        };
        buffer.replace_range(start, end, &format!("\n{indent}"))?;
        Ok(InputOutcome::Handled)
    }

    fn handle_backspace(&self, buffer: &mut TextBuffer) -> Result<InputOutcome, EditError> {
        if buffer.selection().is_some() {
            return Ok(InputOutcome::PassThrough);
        }
        let cursor = buffer.cursor();
        if cursor.column == 0 {
            return Ok(InputOutcome::PassThrough);
        }

        if self.auto_pair {
            let prev = buffer.char_before(cursor);
            let next = buffer.char_at(cursor);
            let empty_pair = prev
                .and_then(pair_for_open)
                .is_some_and(|pair| next == Some(pair.close));
            if empty_pair {
                buffer.delete_range(
                    Position::new(cursor.line, cursor.column - 1),
                    Position::new(cursor.line, cursor.column + 1),
                )?;
                return Ok(InputOutcome::Handled);
            }
        }

        if self.auto_indent {
            let tab_width = buffer.tab_width();
            let line = buffer.line(cursor.line).unwrap_or_default();
            let prefix: Vec<char> = line.chars().take(cursor.column).collect();
            let only_whitespace = prefix.iter().all(|c| *c == ' ' || *c == '\t');
            let level_of_spaces = prefix.len() >= tab_width
                && prefix[prefix.len() - tab_width..].iter().all(|c| *c == ' ');
            if only_whitespace && level_of_spaces {
                let level_start = Position::new(cursor.line, cursor.column - tab_width);
                buffer.delete_range(level_start, cursor)?;
                return Ok(InputOutcome::Handled);
            }
        }

        Ok(InputOutcome::PassThrough)
    }
}

/// Apply the plain edit for `event` at every cursor: typed text replaces the primary selection,
/// Tab inserts `tab_width` spaces, Backspace and Delete remove the primary selection or one
/// grapheme cluster next to each cursor (joining lines at line boundaries).
pub fn apply_default(buffer: &mut TextBuffer, event: &InputEvent) -> Result<(), EditError> {
    match event {
        InputEvent::Char(ch) => buffer.insert_at_cursors(&ch.to_string()),
        InputEvent::Newline => buffer.insert_at_cursors("\n"),
        InputEvent::Paste(text) => buffer.insert_at_cursors(text),
        InputEvent::Tab => {
            let spaces = " ".repeat(buffer.tab_width());
            buffer.insert_at_cursors(&spaces)
        }
        InputEvent::Backspace => buffer.delete_at_cursors(DeleteDirection::Backward),
        InputEvent::Delete => buffer.delete_at_cursors(DeleteDirection::Forward),
    };
    Ok(())
}

/// `true` if an unescaped `quote` before `pos` on its line is still unclosed.
fn quote_is_open(buffer: &TextBuffer, pos: Position, quote: char) -> bool {
    let line = buffer.line(pos.line).unwrap_or_default();
    let mut open = false;
    let mut escaped = false;
    for ch in line.chars().take(pos.column) {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            open = !open;
        }
    }
    open
}

/// One indent level: a tab when the line is tab-indented, spaces otherwise.
fn indent_unit(leading: &str, tab_width: usize) -> String {
    if leading.starts_with('\t') {
        "\t".to_string()
    } else {
        " ".repeat(tab_width)
    }
}

/// Remove one indent level from the end of a whitespace run.
fn dedent(indent: &str, tab_width: usize) -> String {
    if let Some(stripped) = indent.strip_suffix('\t') {
        return stripped.to_string();
    }
    let trailing_spaces = indent.chars().rev().take_while(|c| *c == ' ').count();
    let remove = trailing_spaces.min(tab_width);
    indent[..indent.len() - remove].to_string()
}
