//! Tests for the quote-aware tokenizer.

use crate::split_args;

#[test]
fn splits_on_whitespace() {
    assert_eq!(split_args("a b c"), vec!["a", "b", "c"]);
}

#[test]
fn collapses_repeated_whitespace() {
    assert_eq!(split_args("  a   b  "), vec!["a", "b"]);
}

#[test]
fn empty_input_yields_no_tokens() {
    assert!(split_args("").is_empty());
    assert!(split_args("   ").is_empty());
}

#[test]
fn double_quotes_preserve_inner_whitespace() {
    assert_eq!(
        split_args(r#"say "hello there" twice"#),
        vec!["say", "hello there", "twice"]
    );
}

#[test]
fn single_quotes_work_like_double_quotes() {
    assert_eq!(split_args("say 'a b'"), vec!["say", "a b"]);
}

#[test]
fn quote_of_the_other_kind_is_literal() {
    assert_eq!(split_args(r#"'it"s' fine"#), vec![r#"it"s"#, "fine"]);
    assert_eq!(split_args(r#""don't" stop"#), vec!["don't", "stop"]);
}

#[test]
fn quote_characters_are_dropped() {
    assert_eq!(split_args(r#""solo""#), vec!["solo"]);
}

#[test]
fn quoted_run_joins_with_adjacent_text() {
    assert_eq!(split_args(r#"pre"mid dle"post"#), vec!["premid dlepost"]);
}
