//! Tests for [`StringReader`].

use crate::StringReader;

#[test]
fn reads_characters_in_order() {
    let mut reader = StringReader::new("ab");
    assert_eq!(reader.read_char(), Some('a'));
    assert_eq!(reader.read_char(), Some('b'));
    assert_eq!(reader.read_char(), None);
    assert!(reader.at_end());
}

#[test]
fn peek_does_not_consume() {
    let mut reader = StringReader::new("xy");
    assert_eq!(reader.peek_char(), Some('x'));
    assert_eq!(reader.peek_char(), Some('x'));
    assert_eq!(reader.read_char(), Some('x'));
}

#[test]
fn read_until_consumes_the_terminator() {
    let mut reader = StringReader::new("add 2 3");
    assert_eq!(reader.read_until(char::is_whitespace), "add");
    assert_eq!(reader.rest(), "2 3");
}

#[test]
fn read_until_without_match_returns_everything() {
    let mut reader = StringReader::new("help");
    assert_eq!(reader.read_until(char::is_whitespace), "help");
    assert!(reader.at_end());
    assert_eq!(reader.rest(), "");
}

#[test]
fn reset_rewinds_the_cursor() {
    let mut reader = StringReader::new("ok");
    let _ = reader.read_char();
    reader.reset();
    assert_eq!(reader.read_char(), Some('o'));
}

#[test]
fn handles_multi_byte_characters() {
    let mut reader = StringReader::new("héllo wörld");
    assert_eq!(reader.read_until(char::is_whitespace), "héllo");
    assert_eq!(reader.rest(), "wörld");
}
