//! Marker tokenizer and command classifier

use lazy_static::lazy_static;
use regex::Regex;

use super::types::Token;

/// Opening delimiter of a command marker
pub const MARKER_OPEN: &str = "<!---";

/// Closing delimiter of a command marker
pub const MARKER_CLOSE: &str = "--->";

/// Pattern matching one marker; the interior is lazy so adjacent markers stay apart
pub const MARKER_PATTERN: &str = r"<!---\s*(.*?)\s*--->";

/// Command word opening a named block
pub const BLOCK_KEYWORD: &str = "B";

/// Command word closing the innermost open block
pub const END_KEYWORD: &str = "/B";

/// Commands starting with this character are comments
pub const COMMENT_PREFIX: char = '#';

lazy_static! {
    static ref MARKER: Regex = Regex::new(MARKER_PATTERN).unwrap();
}

pub(crate) fn marker_regex() -> &'static Regex {
    &MARKER
}

/// Split raw template text into literal spans and classified markers.
///
/// Never fails: text that matches no marker is returned as [`Token::Literal`].
/// Empty literal spans between adjacent markers are not emitted.
pub fn lex(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for captures in MARKER.captures_iter(text) {
        let Some(marker) = captures.get(0) else {
            continue;
        };

        if marker.start() > last {
            tokens.push(Token::Literal(text[last..marker.start()].to_string()));
        }

        let command = captures.get(1).map_or("", |m| m.as_str());
        tokens.push(lex_command(command, marker.start()));
        last = marker.end();
    }

    if last < text.len() {
        tokens.push(Token::Literal(text[last..].to_string()));
    }

    tokens
}

/// Split a marker's command text into its command word and the remainder.
///
/// The split happens on the first run of whitespace; the remainder is trimmed.
pub fn split_marker(command: &str) -> (&str, &str) {
    let command = command.trim();
    match command.find(char::is_whitespace) {
        Some(idx) => (&command[..idx], command[idx..].trim()),
        None => (command, ""),
    }
}

/// Classify the command text of one marker.
///
/// `offset` is the byte position of the marker in the source and is kept on
/// [`Token::End`] for diagnostics.
pub fn lex_command(command: &str, offset: usize) -> Token {
    let command = command.trim();

    if command.is_empty() || command.starts_with(COMMENT_PREFIX) {
        return Token::Comment(command.to_string());
    }

    let (word, remainder) = split_marker(command);
    match word {
        BLOCK_KEYWORD if !remainder.is_empty() => Token::Begin {
            name: clean_name(remainder),
        },
        END_KEYWORD => Token::End { offset },
        _ => Token::Content(clean_name(command)),
    }
}

/// Strip marker delimiters and surrounding whitespace from a raw reference.
pub fn clean_name(raw: &str) -> String {
    let name = raw.trim();
    let name = name.strip_prefix(MARKER_OPEN).unwrap_or(name);
    let name = name.strip_suffix(MARKER_CLOSE).unwrap_or(name);
    name.trim().to_string()
}
