use pretty_assertions::assert_eq;
use textpad_core::search::{
    self, Replacement, SearchError, SearchQuery, SearchScope, find, find_next, find_previous,
};
use textpad_core::{DocumentSet, EditError, MatchSpan, Position, TextBuffer};

fn span(line: usize, start: usize, end: usize) -> MatchSpan {
    MatchSpan::new(Position::new(line, start), Position::new(line, end))
}

#[test]
fn test_find_case_insensitive_with_and_without_whole_word() {
    let buffer = TextBuffer::new("Cat cat CATALOG");

    let query = SearchQuery::literal("cat")
        .case_sensitive(false)
        .whole_word(true);
    assert_eq!(
        find(&query, &buffer).unwrap(),
        vec![span(0, 0, 3), span(0, 4, 7)]
    );

    let query = query.whole_word(false);
    assert_eq!(
        find(&query, &buffer).unwrap(),
        vec![span(0, 0, 3), span(0, 4, 7), span(0, 8, 11)]
    );

    let query = query.case_sensitive(true);
    assert_eq!(find(&query, &buffer).unwrap(), vec![span(0, 4, 7)]);
}

#[test]
fn test_whole_word_finds_overlapping_candidate() {
    let buffer = TextBuffer::new("ba a a");
    let query = SearchQuery::literal("a a").whole_word(true);
    assert_eq!(find(&query, &buffer).unwrap(), vec![span(0, 3, 6)]);

    let mut buffer = TextBuffer::new("ba a a");
    let count = search::replace_all_in_buffer(&query, &"X".into(), &mut buffer).unwrap();
    assert_eq!(count, 1);
    assert_eq!(buffer.text(), "ba X");
}

#[test]
fn test_whole_word_is_ignored_for_regex_queries() {
    let buffer = TextBuffer::new("cats cat");
    let query = SearchQuery::regex("cat").whole_word(true);
    assert_eq!(
        find(&query, &buffer).unwrap(),
        vec![span(0, 0, 3), span(0, 5, 8)]
    );

    let bounded = SearchQuery::regex(r"\bcat\b");
    assert_eq!(find(&bounded, &buffer).unwrap(), vec![span(0, 5, 8)]);
}

#[test]
fn test_literal_metacharacters_are_not_regex() {
    let buffer = TextBuffer::new("a+b aab a+b");
    let query = SearchQuery::literal("a+b");
    assert_eq!(
        find(&query, &buffer).unwrap(),
        vec![span(0, 0, 3), span(0, 8, 11)]
    );
}

#[test]
fn test_regex_matches_across_lines_in_document_order() {
    let buffer = TextBuffer::new("a1 b22\nc333\nfoo");

    let digits = SearchQuery::regex(r"\d+");
    assert_eq!(
        find(&digits, &buffer).unwrap(),
        vec![span(0, 1, 2), span(0, 4, 6), span(1, 1, 4)]
    );

    let line_start = SearchQuery::regex("^[a-z]");
    assert_eq!(find(&line_start, &buffer).unwrap().len(), 3);

    let spanning = SearchQuery::regex(r"22\nc");
    assert_eq!(
        find(&spanning, &buffer).unwrap(),
        vec![MatchSpan::new(Position::new(0, 4), Position::new(1, 1))]
    );
}

#[test]
fn test_invalid_regex_is_reported() {
    let buffer = TextBuffer::new("(abc)");
    let err = find(&SearchQuery::regex("(abc"), &buffer).unwrap_err();
    assert!(matches!(err, SearchError::InvalidPattern(_)));
    assert!(!err.is_warning());
}

#[test]
fn test_empty_pattern_and_zero_length_matches_yield_nothing() {
    let buffer = TextBuffer::new("abc");
    assert!(find(&SearchQuery::literal(""), &buffer).unwrap().is_empty());
    assert!(find(&SearchQuery::regex("x*"), &buffer).unwrap().is_empty());
}

#[test]
fn test_find_next_wraps_to_start() {
    let buffer = TextBuffer::new("one two one");
    let query = SearchQuery::literal("one");

    let next = |column| find_next(&query, &buffer, Position::new(0, column)).unwrap();
    assert_eq!(next(0), Some(span(0, 0, 3)));
    assert_eq!(next(1), Some(span(0, 8, 11)));
    assert_eq!(next(9), Some(span(0, 0, 3)));

    let none = find_next(&SearchQuery::literal("zzz"), &buffer, Position::new(0, 0)).unwrap();
    assert_eq!(none, None);
}

#[test]
fn test_find_previous_wraps_to_end() {
    let buffer = TextBuffer::new("one two one");
    let query = SearchQuery::literal("one");

    let previous = |column| find_previous(&query, &buffer, Position::new(0, column)).unwrap();
    assert_eq!(previous(11), Some(span(0, 8, 11)));
    assert_eq!(previous(7), Some(span(0, 0, 3)));
    assert_eq!(previous(2), Some(span(0, 8, 11)));
}

#[test]
fn test_find_next_rejects_invalid_position() {
    let buffer = TextBuffer::new("abc");
    let err = find_next(&SearchQuery::literal("a"), &buffer, Position::new(3, 0)).unwrap_err();
    assert_eq!(
        err,
        SearchError::Edit(EditError::InvalidPosition { line: 3, column: 0 })
    );
}

#[test]
fn test_replace_one_moves_cursor_and_clears_history() {
    let mut buffer = TextBuffer::new("foo bar foo");
    buffer.insert(Position::new(0, 3), "!").unwrap();
    buffer.undo().unwrap();
    assert!(buffer.can_redo());

    let query = SearchQuery::literal("foo");
    let cursor = search::replace_one(
        &query,
        &Replacement::new("baz"),
        &mut buffer,
        span(0, 8, 11),
    )
    .unwrap();

    assert_eq!(buffer.text(), "foo bar baz");
    assert_eq!(cursor, Position::new(0, 11));
    assert_eq!(buffer.cursor(), cursor);
    assert!(buffer.is_modified());
    assert!(!buffer.can_undo());
    assert!(!buffer.can_redo());
}

#[test]
fn test_replace_one_rejects_stale_span() {
    let mut buffer = TextBuffer::new("foo bar");
    let err = search::replace_one(
        &SearchQuery::literal("foo"),
        &Replacement::new("x"),
        &mut buffer,
        span(0, 4, 7),
    )
    .unwrap_err();
    assert!(matches!(err, SearchError::StaleMatch { .. }));
    assert_eq!(buffer.text(), "foo bar");
}

#[test]
fn test_replace_one_with_empty_text_needs_confirmation() {
    let mut buffer = TextBuffer::new("foo bar");
    let query = SearchQuery::literal("foo ");

    let err =
        search::replace_one(&query, &Replacement::new(""), &mut buffer, span(0, 0, 4)).unwrap_err();
    assert_eq!(err, SearchError::EmptyReplacement);
    assert!(err.is_warning());
    assert_eq!(buffer.text(), "foo bar");

    let confirmed = Replacement::new("").confirmed();
    search::replace_one(&query, &confirmed, &mut buffer, span(0, 0, 4)).unwrap();
    assert_eq!(buffer.text(), "bar");
    assert_eq!(buffer.cursor(), Position::new(0, 0));
}

#[test]
fn test_replace_all_empty_replacement_across_open_buffers() {
    let mut docs = DocumentSet::new();
    let first = docs.open(TextBuffer::new("a b")).unwrap();
    let second = docs.open(TextBuffer::new("b a")).unwrap();
    let query = SearchQuery::literal("a").scope(SearchScope::AllOpen);

    let err = search::replace_all(&query, &Replacement::new(""), &mut docs).unwrap_err();
    assert!(err.is_warning());
    assert_eq!(docs.get(first).unwrap().text(), "a b");
    assert!(!docs.get(second).unwrap().is_modified());

    let result = search::replace_all(&query, &Replacement::new("").confirmed(), &mut docs).unwrap();
    assert_eq!(result.replacements_made, 2);
    assert_eq!(result.files_affected, 2);
    assert_eq!(result.per_file.get(&first), Some(&1));
    assert_eq!(result.per_file.get(&second), Some(&1));
    assert_eq!(docs.get(first).unwrap().text(), " b");
    assert_eq!(docs.get(second).unwrap().text(), "b ");
}

#[test]
fn test_replace_all_accounts_for_length_changes() {
    let mut buffer = TextBuffer::new("aXbXc\nXX");
    let count = search::replace_all_in_buffer(
        &SearchQuery::literal("X"),
        &Replacement::new("--"),
        &mut buffer,
    )
    .unwrap();
    assert_eq!(count, 4);
    assert_eq!(buffer.text(), "a--b--c\n----");

    let mut buffer = TextBuffer::new("foo foo foo");
    search::replace_all_in_buffer(&SearchQuery::literal("foo"), &"x".into(), &mut buffer).unwrap();
    assert_eq!(buffer.text(), "x x x");
}

#[test]
fn test_replace_all_keeps_cursor_in_place() {
    let mut buffer = TextBuffer::new("ab ab tail");
    buffer.set_cursor(Position::new(0, 6)).unwrap();
    buffer.insert(Position::new(0, 10), "!").unwrap();
    buffer.set_cursor(Position::new(0, 6)).unwrap();

    search::replace_all_in_buffer(&SearchQuery::literal("ab"), &"abc".into(), &mut buffer)
        .unwrap();

    assert_eq!(buffer.text(), "abc abc tail!");
    assert_eq!(buffer.cursor(), Position::new(0, 8));
    assert!(!buffer.can_undo());
}

#[test]
fn test_regex_replacement_expands_groups() {
    let mut buffer = TextBuffer::new("me@host you@there");
    let query = SearchQuery::regex(r"(\w+)@(?P<host>\w+)");
    search::replace_all_in_buffer(&query, &"${host} at $1".into(), &mut buffer).unwrap();
    assert_eq!(buffer.text(), "host at me there at you");

    let mut buffer = TextBuffer::new("a b");
    search::replace_all_in_buffer(&SearchQuery::literal("a"), &"$1".into(), &mut buffer).unwrap();
    assert_eq!(buffer.text(), "$1 b");
}

#[test]
fn test_replace_all_scope_limits_buffers() {
    let mut docs = DocumentSet::new();
    let first = docs.open(TextBuffer::new("x")).unwrap();
    let second = docs.open(TextBuffer::new("x")).unwrap();

    let query = SearchQuery::literal("x").scope(SearchScope::Buffer(second));
    let result = search::replace_all(&query, &"y".into(), &mut docs).unwrap();
    assert_eq!(result.replacements_made, 1);
    assert_eq!(docs.get(first).unwrap().text(), "x");
    assert_eq!(docs.get(second).unwrap().text(), "y");

    docs.close(second).unwrap();
    let query = query.scope(SearchScope::Buffer(second));
    let err = search::replace_all(&query, &"y".into(), &mut docs).unwrap_err();
    assert_eq!(err, SearchError::BufferNotFound(second));
}

#[test]
fn test_replace_all_never_touches_closed_buffers() {
    let mut docs = DocumentSet::new();
    let kept = docs.open(TextBuffer::new("old")).unwrap();
    let closed = docs.open(TextBuffer::new("old")).unwrap();
    let closed_buffer = docs.close(closed).unwrap();

    let query = SearchQuery::literal("old");
    let result = search::replace_all(&query, &"new".into(), &mut docs).unwrap();
    assert_eq!(result.files_affected, 1);
    assert_eq!(docs.get(kept).unwrap().text(), "new");
    assert_eq!(closed_buffer.text(), "old");
}

#[test]
fn test_replace_all_invalid_pattern_modifies_nothing() {
    let mut docs = DocumentSet::new();
    let id = docs.open(TextBuffer::new("[x]")).unwrap();

    let err = search::replace_all(&SearchQuery::regex("["), &"y".into(), &mut docs).unwrap_err();
    assert!(matches!(err, SearchError::InvalidPattern(_)));
    assert_eq!(docs.get(id).unwrap().text(), "[x]");
}

#[test]
fn test_find_in_documents_summarizes_matches() {
    let mut docs = DocumentSet::new();
    let first = docs.open(TextBuffer::new("todo: a\ntodo: b")).unwrap();
    docs.open(TextBuffer::new("nothing here")).unwrap();
    let third = docs.open(TextBuffer::new("TODO later")).unwrap();

    let query = SearchQuery::literal("todo").case_sensitive(false);
    let found = search::find_in_documents(&query, &docs).unwrap();

    assert_eq!(found.summary.total_matches, 3);
    assert_eq!(found.summary.files_with_matches, 2);
    let ids: Vec<_> = found.buffers.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![first, third]);
    assert_eq!(found.buffers[0].spans, vec![span(0, 0, 4), span(1, 0, 4)]);
    assert_eq!(found.buffers[0].path, None);
}
