use pretty_assertions::assert_eq;
use textpad_core::{AutoPairEngine, EditorConfig, InputEvent, InputOutcome, Position, TextBuffer};

fn engine() -> AutoPairEngine {
    AutoPairEngine::new(&EditorConfig::default())
}

fn type_str(engine: &AutoPairEngine, buffer: &mut TextBuffer, text: &str) {
    for ch in text.chars() {
        engine.dispatch(buffer, &InputEvent::Char(ch)).unwrap();
    }
}

#[test]
fn test_open_paren_pairs_and_close_types_through() {
    let engine = engine();
    let mut buffer = TextBuffer::new("");

    engine.dispatch(&mut buffer, &InputEvent::Char('(')).unwrap();
    assert_eq!(buffer.text(), "()");
    assert_eq!(buffer.cursor(), Position::new(0, 1));

    engine.dispatch(&mut buffer, &InputEvent::Char(')')).unwrap();
    assert_eq!(buffer.text(), "()");
    assert_eq!(buffer.cursor(), Position::new(0, 2));
}

#[test]
fn test_brackets_pair_even_before_a_word() {
    let engine = engine();
    let mut buffer = TextBuffer::new("abc");

    engine.dispatch(&mut buffer, &InputEvent::Char('[')).unwrap();
    assert_eq!(buffer.text(), "[]abc");
    assert_eq!(buffer.cursor(), Position::new(0, 1));
}

#[test]
fn test_typing_a_call_end_to_end() {
    let engine = engine();
    let mut buffer = TextBuffer::new("");

    type_str(&engine, &mut buffer, "f(a[0])");
    assert_eq!(buffer.text(), "f(a[0])");
    assert_eq!(buffer.cursor(), Position::new(0, 7));
}

#[test]
fn test_close_without_autoinserted_partner_is_inserted() {
    let engine = engine();
    let mut buffer = TextBuffer::new("(a");
    buffer.set_cursor(Position::new(0, 2)).unwrap();

    engine.dispatch(&mut buffer, &InputEvent::Char(')')).unwrap();
    assert_eq!(buffer.text(), "(a)");
}

#[test]
fn test_opener_wraps_selection() {
    let engine = engine();
    let mut buffer = TextBuffer::new("hello world");
    buffer
        .set_selection(Position::new(0, 0), Position::new(0, 5))
        .unwrap();

    engine.dispatch(&mut buffer, &InputEvent::Char('(')).unwrap();
    assert_eq!(buffer.text(), "(hello) world");
    assert_eq!(buffer.selected_text().as_deref(), Some("hello"));

    engine.dispatch(&mut buffer, &InputEvent::Char('"')).unwrap();
    assert_eq!(buffer.text(), "(\"hello\") world");
    assert_eq!(buffer.selected_text().as_deref(), Some("hello"));
}

#[test]
fn test_non_delimiter_replaces_selection() {
    let engine = engine();
    let mut buffer = TextBuffer::new("hello world");
    buffer
        .set_selection(Position::new(0, 6), Position::new(0, 11))
        .unwrap();

    assert_eq!(
        engine.handle(&mut buffer, &InputEvent::Char('x')).unwrap(),
        InputOutcome::PassThrough
    );
    engine.dispatch(&mut buffer, &InputEvent::Char('x')).unwrap();
    assert_eq!(buffer.text(), "hello x");
}

#[test]
fn test_quotes_pair_and_type_through() {
    let engine = engine();
    let mut buffer = TextBuffer::new("");

    engine.dispatch(&mut buffer, &InputEvent::Char('"')).unwrap();
    assert_eq!(buffer.text(), "\"\"");
    assert_eq!(buffer.cursor(), Position::new(0, 1));

    type_str(&engine, &mut buffer, "hi\"");
    assert_eq!(buffer.text(), "\"hi\"");
    assert_eq!(buffer.cursor(), Position::new(0, 4));
}

#[test]
fn test_quote_closing_an_open_span_is_not_paired() {
    let engine = engine();
    let mut buffer = TextBuffer::new("say \"hello");
    buffer.set_cursor(Position::new(0, 10)).unwrap();

    engine.dispatch(&mut buffer, &InputEvent::Char('"')).unwrap();
    assert_eq!(buffer.text(), "say \"hello\"");
    assert_eq!(buffer.cursor(), Position::new(0, 11));
}

#[test]
fn test_apostrophe_after_word_is_not_paired() {
    let engine = engine();
    let mut buffer = TextBuffer::new("don");
    buffer.set_cursor(Position::new(0, 3)).unwrap();

    type_str(&engine, &mut buffer, "'t");
    assert_eq!(buffer.text(), "don't");
}

#[test]
fn test_quote_before_word_is_not_paired() {
    let engine = engine();
    let mut buffer = TextBuffer::new("word");

    engine.dispatch(&mut buffer, &InputEvent::Char('\'')).unwrap();
    assert_eq!(buffer.text(), "'word");
}

#[test]
fn test_quote_between_two_closed_quotes_pairs_again() {
    let engine = engine();
    let mut buffer = TextBuffer::new("\"\"");

    engine.dispatch(&mut buffer, &InputEvent::Char('"')).unwrap();
    assert_eq!(buffer.text(), "\"\"\"\"");
    assert_eq!(buffer.cursor(), Position::new(0, 1));
}

#[test]
fn test_escaped_quote_does_not_close_span() {
    let engine = engine();
    let mut buffer = TextBuffer::new("\"a\\");
    buffer.set_cursor(Position::new(0, 3)).unwrap();

    engine.dispatch(&mut buffer, &InputEvent::Char('"')).unwrap();
    assert_eq!(buffer.text(), "\"a\\\"");
}

#[test]
fn test_backspace_inside_empty_pair_deletes_both() {
    let engine = engine();

    for opener in ['(', '[', '{', '"', '\''] {
        let mut buffer = TextBuffer::new("x = ");
        buffer.set_cursor(Position::new(0, 4)).unwrap();
        engine.dispatch(&mut buffer, &InputEvent::Char(opener)).unwrap();
        assert_eq!(buffer.line_len(0), Some(6));

        engine.dispatch(&mut buffer, &InputEvent::Backspace).unwrap();
        assert_eq!(buffer.text(), "x = ");
        assert_eq!(buffer.cursor(), Position::new(0, 4));
    }
}

#[test]
fn test_closing_bracket_in_indentation_dedents() {
    let engine = engine();
    let mut buffer = TextBuffer::new("if x {\n        ");
    buffer.set_cursor(Position::new(1, 8)).unwrap();

    engine.dispatch(&mut buffer, &InputEvent::Char('}')).unwrap();
    assert_eq!(buffer.text(), "if x {\n    }");
    assert_eq!(buffer.cursor(), Position::new(1, 5));
}

#[test]
fn test_disabled_pairing_passes_through() {
    let config = EditorConfig {
        auto_pair: false,
        ..EditorConfig::default()
    };
    let engine = AutoPairEngine::new(&config);
    let mut buffer = TextBuffer::new("");

    assert_eq!(
        engine.handle(&mut buffer, &InputEvent::Char('(')).unwrap(),
        InputOutcome::PassThrough
    );
    assert_eq!(buffer.text(), "");

    type_str(&engine, &mut buffer, "(\"");
    assert_eq!(buffer.text(), "(\"");
}

#[test]
fn test_paste_always_passes_through() {
    let engine = engine();
    let mut buffer = TextBuffer::new("");
    let paste = InputEvent::Paste("fn f() {\r\n}".to_string());

    assert_eq!(
        engine.handle(&mut buffer, &paste).unwrap(),
        InputOutcome::PassThrough
    );
    engine.dispatch(&mut buffer, &paste).unwrap();
    assert_eq!(buffer.text(), "fn f() {\n}");
    assert_eq!(buffer.cursor(), Position::new(1, 1));
}
