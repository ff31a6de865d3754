//! Quote-aware splitting of a raw argument string.

use crate::reader::StringReader;

/// Splits `input` into whitespace-separated tokens, respecting quotes.
///
/// A `'` or `"` toggles quote mode for its own kind; the other kind is
/// taken literally while a quote is open. Quote characters themselves are
/// dropped from the output, and whitespace inside a quoted run is
/// preserved. Empty tokens are never produced.
///
/// # Example
///
/// ```
/// use palaver::split_args;
///
/// let tokens = split_args(r#"say "hello there" twice"#);
/// assert_eq!(tokens, vec!["say", "hello there", "twice"]);
/// ```
#[must_use]
pub fn split_args(input: &str) -> Vec<String> {
    let mut reader = StringReader::new(input);
    let mut single_open = false;
    let mut double_open = false;
    let mut buf = String::new();
    let mut tokens = Vec::new();

    while let Some(ch) = reader.read_char() {
        if ch == '\'' && !double_open {
            single_open = !single_open;
            continue;
        }
        if ch == '"' && !single_open {
            double_open = !double_open;
            continue;
        }

        if !single_open && !double_open && ch.is_whitespace() {
            if !buf.is_empty() {
                tokens.push(std::mem::take(&mut buf));
            }
        } else {
            buf.push(ch);
        }
    }

    if !buf.is_empty() {
        tokens.push(buf);
    }
    tokens
}
