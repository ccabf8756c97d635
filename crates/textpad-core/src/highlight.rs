//! Bracket and quote match highlighting.
//!
//! When the character just before the cursor, or the one under it, is a delimiter from
//! [`crate::pairs::PAIRS`], its partner is located and both are reported as one-character
//! [`MatchSpan`]s, anchor first. Brackets are matched across the whole buffer with a nesting
//! depth counter; quotes are matched within their line by counting unescaped quotes.
//! Unmatched delimiters produce no spans.

use crate::buffer::TextBuffer;
use crate::pairs::{is_quote, pair_for_close, pair_for_open};
use crate::search::MatchSpan;
use ropey::Rope;

/// Spans to highlight for the buffer's current cursor: empty or `[anchor, partner]`.
pub fn find_pair_spans(buffer: &TextBuffer) -> Vec<MatchSpan> {
    let Ok(cursor) = buffer.char_offset(buffer.cursor()) else {
        return Vec::new();
    };
    let rope = buffer.rope();

    let candidates = [cursor.checked_sub(1), Some(cursor)];
    for anchor in candidates.into_iter().flatten() {
        let Some(ch) = rope.get_char(anchor) else {
            continue;
        };
        let partner = if is_quote(ch) {
            match_quote(rope, anchor, ch)
        } else if pair_for_open(ch).is_some() {
            match_forward(rope, anchor)
        } else if pair_for_close(ch).is_some() {
            match_backward(rope, anchor)
        } else {
            None
        };

        if let Some(partner) = partner {
            return vec![char_span(buffer, anchor), char_span(buffer, partner)];
        }
    }
    Vec::new()
}

fn char_span(buffer: &TextBuffer, offset: usize) -> MatchSpan {
    MatchSpan {
        start: buffer.position_at(offset),
        end: buffer.position_at(offset + 1),
    }
}

fn match_forward(rope: &Rope, open_at: usize) -> Option<usize> {
    let open = rope.get_char(open_at)?;
    let close = pair_for_open(open)?.close;
    let mut depth = 0usize;
    for (offset, ch) in (open_at + 1..).zip(rope.chars_at(open_at + 1)) {
        if ch == open {
            depth += 1;
        } else if ch == close {
            if depth == 0 {
                return Some(offset);
            }
            depth -= 1;
        }
    }
    None
}

fn match_backward(rope: &Rope, close_at: usize) -> Option<usize> {
    let close = rope.get_char(close_at)?;
    let open = pair_for_close(close)?.open;
    let mut depth = 0usize;
    let mut chars = rope.chars_at(close_at);
    let mut offset = close_at;
    while let Some(ch) = chars.prev() {
        offset -= 1;
        if ch == close {
            depth += 1;
        } else if ch == open {
            if depth == 0 {
                return Some(offset);
            }
            depth -= 1;
        }
    }
    None
}

fn match_quote(rope: &Rope, at: usize, quote: char) -> Option<usize> {
    let line_idx = rope.char_to_line(at);
    let line_start = rope.line_to_char(line_idx);
    let column = at - line_start;

    let quotes = unescaped_quotes(rope.line(line_idx).chars(), quote);
    let index = quotes.iter().position(|col| *col == column)?;
    let partner = if index % 2 == 0 {
        quotes.get(index + 1)
    } else {
        quotes.get(index - 1)
    };
    partner.map(|col| line_start + col)
}

/// Columns of `quote` characters in a line that are not escaped with a backslash.
fn unescaped_quotes(line: impl Iterator<Item = char>, quote: char) -> Vec<usize> {
    let mut columns = Vec::new();
    let mut escaped = false;
    for (column, ch) in line.enumerate() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            columns.push(column);
        }
    }
    columns
}

#[derive(Debug, Clone)]
struct Computed {
    instance: u64,
    revision: u64,
    spans: Vec<MatchSpan>,
}

impl Computed {
    fn is_current(&self, buffer: &TextBuffer) -> bool {
        self.instance == buffer.instance() && self.revision == buffer.revision()
    }
}

/// Caches the pair spans for the buffer it last saw and refuses to hand out stale ones.
///
/// Call [`MatchHighlighter::refresh`] after every edit, cursor move or buffer switch.
/// [`MatchHighlighter::spans`] returns nothing once the buffer has changed since the last
/// refresh, or when asked about a different buffer.
#[derive(Debug, Clone, Default)]
pub struct MatchHighlighter {
    computed: Option<Computed>,
}

impl MatchHighlighter {
    /// Create a highlighter with nothing computed yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute spans unless they were computed for this exact buffer state.
    pub fn refresh(&mut self, buffer: &TextBuffer) -> &[MatchSpan] {
        let stale = self
            .computed
            .as_ref()
            .is_none_or(|computed| !computed.is_current(buffer));
        if stale {
            self.computed = Some(Computed {
                instance: buffer.instance(),
                revision: buffer.revision(),
                spans: find_pair_spans(buffer),
            });
        }
        self.spans(buffer)
    }

    /// Spans from the last refresh, or none if they were not computed for `buffer` as it is now.
    pub fn spans(&self, buffer: &TextBuffer) -> &[MatchSpan] {
        match &self.computed {
            Some(computed) if computed.is_current(buffer) => computed.spans.as_slice(),
            _ => &[],
        }
    }

    /// Drop any computed spans.
    pub fn clear(&mut self) {
        self.computed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escaped_quotes_are_not_delimiters() {
        let cols = unescaped_quotes(r#"a "b \" c" d"#.chars(), '"');
        assert_eq!(cols, vec![2, 9]);
    }

    #[test]
    fn nested_brackets_match_outermost() {
        let rope = Rope::from_str("(a (b) c)");
        assert_eq!(match_forward(&rope, 0), Some(8));
        assert_eq!(match_backward(&rope, 8), Some(0));
        assert_eq!(match_forward(&rope, 3), Some(5));
    }

    #[test]
    fn unbalanced_bracket_has_no_partner() {
        let rope = Rope::from_str("((a)");
        assert_eq!(match_forward(&rope, 0), None);
    }
}
