//! Find and replace over one buffer or every open buffer.
//!
//! Queries are either literal strings (escaped and compiled into a regex) or regex patterns,
//! with optional case-insensitivity. Literal queries can be restricted to whole words. Matching
//! runs on the buffer text and reports [`MatchSpan`]s in `(line, column)` positions, in document
//! order. Zero-length matches are skipped and an empty pattern matches nothing.
//!
//! Replacements never enter undo history: they are applied in one sweep per buffer and clear that
//! buffer's undo and redo stacks. An empty replacement must be confirmed first (see
//! [`Replacement::confirmed`]); otherwise the call fails with [`SearchError::EmptyReplacement`]
//! before anything is touched.

use crate::buffer::{EditError, OffsetEdit, Position, TextBuffer};
use crate::documents::{BufferId, DocumentSet};
use crate::pairs::is_word_char;
use regex::{Captures, Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Which buffers a query applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// A single open buffer.
    Buffer(BufferId),
    /// Every buffer open in the [`DocumentSet`].
    #[default]
    AllOpen,
}

/// A find/replace request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Literal text or regex pattern.
    pub pattern: String,
    /// Treat `pattern` as a regex instead of literal text.
    pub is_regex: bool,
    /// Match case exactly.
    pub case_sensitive: bool,
    /// Only match spans not adjacent to word characters (alphanumeric or `_`).
    ///
    /// Applies to literal queries only. A regex query is taken as written; use `\b` in the
    /// pattern for word boundaries.
    pub whole_word: bool,
    /// Buffers considered by [`replace_all`] and [`find_in_documents`].
    pub scope: SearchScope,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            pattern: String::new(),
            is_regex: false,
            case_sensitive: true,
            whole_word: false,
            scope: SearchScope::AllOpen,
        }
    }
}

impl SearchQuery {
    /// Case-sensitive literal query over all open buffers.
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    /// Case-sensitive regex query over all open buffers.
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: true,
            ..Self::default()
        }
    }

    /// Set case sensitivity.
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Set whole-word matching.
    pub fn whole_word(mut self, whole_word: bool) -> Self {
        self.whole_word = whole_word;
        self
    }

    /// Set the scope.
    pub fn scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Compile the query, or `None` for an empty pattern.
    fn compile(&self) -> Result<Option<CompiledQuery>, SearchError> {
        if self.pattern.is_empty() {
            return Ok(None);
        }

        let pattern = if self.is_regex {
            self.pattern.clone()
        } else {
            regex::escape(&self.pattern)
        };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!self.case_sensitive)
            .multi_line(true)
            .build()
            .map_err(|err| {
                log::warn!("rejected search pattern {:?}: {err}", self.pattern);
                SearchError::InvalidPattern(err)
            })?;

        Ok(Some(CompiledQuery {
            regex,
            whole_word: self.whole_word && !self.is_regex,
            expand_groups: self.is_regex,
        }))
    }
}

/// A located range: a search match or a highlighted delimiter. Half-open, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchSpan {
    /// First character of the range.
    pub start: Position,
    /// Position just past the last character.
    pub end: Position,
}

impl MatchSpan {
    /// Create a span.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Replacement text, with the confirmation an empty replacement requires.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Replacement {
    text: String,
    confirmed: bool,
}

impl Replacement {
    /// Replacement text. For regex queries `$1`, `${name}` and `$$` are expanded.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confirmed: false,
        }
    }

    /// Mark the replacement as confirmed by the user, allowing an empty one.
    pub fn confirmed(mut self) -> Self {
        self.confirmed = true;
        self
    }

    /// The raw replacement text.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn check(&self) -> Result<(), SearchError> {
        if self.text.is_empty() && !self.confirmed {
            return Err(SearchError::EmptyReplacement);
        }
        Ok(())
    }
}

impl From<&str> for Replacement {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Replacement {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Search and replace errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// The regex pattern failed to compile.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[source] regex::Error),
    /// The replacement is empty and was not confirmed. Not fatal: ask the user, then retry with
    /// [`Replacement::confirmed`].
    #[error("replacement is empty; matches would be deleted")]
    EmptyReplacement,
    /// The scope names a buffer that is not open.
    #[error("buffer {0} is not open")]
    BufferNotFound(BufferId),
    /// The span passed to [`replace_one`] is no longer a match of the query.
    #[error("no match at {start:?}..{end:?}")]
    StaleMatch {
        /// Span start.
        start: Position,
        /// Span end.
        end: Position,
    },
    /// A position passed in was invalid.
    #[error(transparent)]
    Edit(#[from] EditError),
}

impl SearchError {
    /// `true` for conditions that need user confirmation rather than reporting as failures.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::EmptyReplacement)
    }
}

/// Matches found in one open buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferMatches {
    /// Buffer id.
    pub id: BufferId,
    /// File path, `None` for untitled buffers.
    pub path: Option<PathBuf>,
    /// Matches in document order.
    pub spans: Vec<MatchSpan>,
}

/// Totals over a multi-buffer search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchSummary {
    /// Matches across all buffers.
    pub total_matches: usize,
    /// Buffers with at least one match.
    pub files_with_matches: usize,
}

/// Result of [`find_in_documents`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentMatches {
    /// Buffers with matches, in id order.
    pub buffers: Vec<BufferMatches>,
    /// Totals.
    pub summary: SearchSummary,
}

/// Outcome of [`replace_all`].
///
/// The replacements are not undoable; the affected buffers' history is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplaceResult {
    /// Replacements made across all buffers.
    pub replacements_made: usize,
    /// Buffers with at least one replacement.
    pub files_affected: usize,
    /// Replacements per buffer, only for buffers that changed.
    pub per_file: BTreeMap<BufferId, usize>,
}

struct CompiledQuery {
    regex: Regex,
    whole_word: bool,
    expand_groups: bool,
}

struct Found<'t> {
    start: usize,
    end: usize,
    captures: Captures<'t>,
}

impl CompiledQuery {
    /// Accepted matches in `text`, as character offsets.
    ///
    /// A candidate rejected by the whole-word check does not consume its text: scanning resumes
    /// one character past its start, so an overlapping candidate can still match.
    fn matches<'t>(&self, text: &'t str, index: &CharIndex) -> Vec<Found<'t>> {
        let mut found = Vec::new();
        let mut at = 0;
        while at <= text.len() {
            let Some(captures) = self.regex.captures_at(text, at) else {
                break;
            };
            let Some(m) = captures.get(0) else {
                break;
            };
            let start = index.byte_to_char(m.start());
            let end = index.byte_to_char(m.end());
            if start == end {
                at = index.char_to_byte(end + 1).max(m.end() + 1);
                continue;
            }
            if self.whole_word && !is_whole_word(text, index, start, end) {
                at = index.char_to_byte(start + 1);
                continue;
            }
            at = m.end();
            found.push(Found {
                start,
                end,
                captures,
            });
        }
        found
    }

    fn replacement_for(&self, found: &Found<'_>, template: &str) -> String {
        if self.expand_groups {
            let mut out = String::new();
            found.captures.expand(template, &mut out);
            out
        } else {
            template.to_string()
        }
    }
}

#[derive(Debug)]
pub(crate) struct CharIndex {
    char_to_byte: Vec<usize>,
    text_len: usize,
}

impl CharIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut char_to_byte: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        char_to_byte.push(text.len());
        Self {
            char_to_byte,
            text_len: text.len(),
        }
    }

    pub(crate) fn char_count(&self) -> usize {
        self.char_to_byte.len().saturating_sub(1)
    }

    pub(crate) fn char_to_byte(&self, char_offset: usize) -> usize {
        self.char_to_byte
            .get(char_offset)
            .copied()
            .unwrap_or(self.text_len)
    }

    pub(crate) fn byte_to_char(&self, byte_offset: usize) -> usize {
        let clamped = byte_offset.min(self.text_len);
        match self.char_to_byte.binary_search(&clamped) {
            Ok(idx) => idx,
            Err(idx) => idx,
        }
    }

    pub(crate) fn char_at(&self, text: &str, char_offset: usize) -> Option<char> {
        if char_offset >= self.char_count() {
            return None;
        }
        let start = self.char_to_byte[char_offset];
        let end = self.char_to_byte[char_offset + 1];
        text.get(start..end)?.chars().next()
    }
}

fn is_whole_word(text: &str, index: &CharIndex, start: usize, end: usize) -> bool {
    let before = start
        .checked_sub(1)
        .and_then(|prev| index.char_at(text, prev));
    let after = index.char_at(text, end);

    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Match offsets in `buffer`, in document order.
fn match_offsets(query: &CompiledQuery, buffer: &TextBuffer) -> Vec<(usize, usize)> {
    let text = buffer.text();
    let index = CharIndex::new(&text);
    query
        .matches(&text, &index)
        .into_iter()
        .map(|found| (found.start, found.end))
        .collect()
}

fn to_span(buffer: &TextBuffer, (start, end): (usize, usize)) -> MatchSpan {
    MatchSpan::new(buffer.position_at(start), buffer.position_at(end))
}

/// All matches of `query` in `buffer`, in document order.
///
/// Fails with [`SearchError::InvalidPattern`] if a regex query does not compile.
pub fn find(query: &SearchQuery, buffer: &TextBuffer) -> Result<Vec<MatchSpan>, SearchError> {
    let Some(compiled) = query.compile()? else {
        return Ok(Vec::new());
    };
    Ok(match_offsets(&compiled, buffer)
        .into_iter()
        .map(|range| to_span(buffer, range))
        .collect())
}

/// First match starting at or after `from`, wrapping to the first match in the buffer.
pub fn find_next(
    query: &SearchQuery,
    buffer: &TextBuffer,
    from: Position,
) -> Result<Option<MatchSpan>, SearchError> {
    let from = buffer.char_offset(from)?;
    let Some(compiled) = query.compile()? else {
        return Ok(None);
    };
    let matches = match_offsets(&compiled, buffer);
    let next = matches
        .iter()
        .find(|(start, _)| *start >= from)
        .or_else(|| matches.first());
    Ok(next.map(|range| to_span(buffer, *range)))
}

/// Last match ending at or before `from`, wrapping to the last match in the buffer.
pub fn find_previous(
    query: &SearchQuery,
    buffer: &TextBuffer,
    from: Position,
) -> Result<Option<MatchSpan>, SearchError> {
    let from = buffer.char_offset(from)?;
    let Some(compiled) = query.compile()? else {
        return Ok(None);
    };
    let matches = match_offsets(&compiled, buffer);
    let previous = matches
        .iter()
        .rev()
        .find(|(_, end)| *end <= from)
        .or_else(|| matches.last());
    Ok(previous.map(|range| to_span(buffer, *range)))
}

/// Replace the match at `span` and move the cursor to the end of the inserted text.
///
/// `span` must still be a match of `query` (as returned by [`find`] or [`find_next`]). The edit
/// is not recorded in history and clears the buffer's undo and redo stacks.
pub fn replace_one(
    query: &SearchQuery,
    replacement: &Replacement,
    buffer: &mut TextBuffer,
    span: MatchSpan,
) -> Result<Position, SearchError> {
    replacement.check()?;
    let start = buffer.char_offset(span.start)?;
    let end = buffer.char_offset(span.end)?;
    let stale = SearchError::StaleMatch {
        start: span.start,
        end: span.end,
    };
    let compiled = query.compile()?.ok_or(stale.clone())?;

    let text = buffer.text();
    let index = CharIndex::new(&text);
    let found = compiled
        .matches(&text, &index)
        .into_iter()
        .find(|found| found.start == start && found.end == end)
        .ok_or(stale)?;
    let inserted = compiled.replacement_for(&found, replacement.text());

    let caret = start + inserted.chars().count();
    buffer.apply_unrecorded(&[OffsetEdit {
        start,
        end,
        text: inserted,
    }]);
    let cursor = buffer.position_at(caret);
    buffer.set_cursor(cursor)?;
    Ok(cursor)
}

/// Replace every match of `query` in `buffer` in one left-to-right sweep.
///
/// Returns the number of replacements. Not undoable; clears the buffer's history when anything
/// changed.
pub fn replace_all_in_buffer(
    query: &SearchQuery,
    replacement: &Replacement,
    buffer: &mut TextBuffer,
) -> Result<usize, SearchError> {
    replacement.check()?;
    let Some(compiled) = query.compile()? else {
        return Ok(0);
    };
    Ok(replace_compiled(&compiled, replacement, buffer))
}

fn replace_compiled(
    compiled: &CompiledQuery,
    replacement: &Replacement,
    buffer: &mut TextBuffer,
) -> usize {
    let text = buffer.text();
    let index = CharIndex::new(&text);
    let edits: Vec<OffsetEdit> = compiled
        .matches(&text, &index)
        .iter()
        .map(|found| OffsetEdit {
            start: found.start,
            end: found.end,
            text: compiled.replacement_for(found, replacement.text()),
        })
        .collect();

    buffer.apply_unrecorded(&edits);
    edits.len()
}

/// Replace every match in the buffers selected by `query.scope`.
///
/// An unconfirmed empty replacement and an invalid pattern are both reported before any buffer
/// is modified. Only buffers open in `docs` are touched. Not undoable.
pub fn replace_all(
    query: &SearchQuery,
    replacement: &Replacement,
    docs: &mut DocumentSet,
) -> Result<ReplaceResult, SearchError> {
    replacement.check()?;
    let ids = scope_ids(query.scope, docs)?;
    let Some(compiled) = query.compile()? else {
        return Ok(ReplaceResult::default());
    };

    let mut result = ReplaceResult::default();
    for id in ids {
        let Some(buffer) = docs.get_mut(id) else {
            continue;
        };
        let count = replace_compiled(&compiled, replacement, buffer);
        if count > 0 {
            result.replacements_made += count;
            result.files_affected += 1;
            result.per_file.insert(id, count);
        }
    }

    log::debug!(
        "replaced {} match(es) of {:?} in {} buffer(s)",
        result.replacements_made,
        query.pattern,
        result.files_affected
    );
    Ok(result)
}

/// Find matches in the buffers selected by `query.scope`.
pub fn find_in_documents(
    query: &SearchQuery,
    docs: &DocumentSet,
) -> Result<DocumentMatches, SearchError> {
    let ids = scope_ids(query.scope, docs)?;
    let Some(compiled) = query.compile()? else {
        return Ok(DocumentMatches::default());
    };

    let mut out = DocumentMatches::default();
    for id in ids {
        let Some(buffer) = docs.get(id) else {
            continue;
        };
        let spans: Vec<MatchSpan> = match_offsets(&compiled, buffer)
            .into_iter()
            .map(|range| to_span(buffer, range))
            .collect();
        if spans.is_empty() {
            continue;
        }

        out.summary.total_matches += spans.len();
        out.summary.files_with_matches += 1;
        out.buffers.push(BufferMatches {
            id,
            path: buffer.path().map(PathBuf::from),
            spans,
        });
    }
    Ok(out)
}

fn scope_ids(scope: SearchScope, docs: &DocumentSet) -> Result<Vec<BufferId>, SearchError> {
    match scope {
        SearchScope::AllOpen => Ok(docs.ids()),
        SearchScope::Buffer(id) if docs.contains(id) => Ok(vec![id]),
        SearchScope::Buffer(id) => Err(SearchError::BufferNotFound(id)),
    }
}
