//! The percent-escape scheme XAPI uses to keep whitespace intact inside XML attributes.
//!
//! `%` followed by one of the codes below stands for the mapped text; any other
//! `%` is taken literally.

pub const ESCAPE_MARK: char = '%';

fn replacement(code: char) -> Option<&'static str> {
    match code {
        '_' => Some("  "),
        '.' => Some(" "),
        't' => Some("\t"),
        'n' => Some("\n"),
        'r' => Some("\r"),
        '%' => Some("%"),
        _ => None,
    }
}

/// Reverse the escaping of `s`.
///
/// The last character is looked at together with a virtual trailing space, so a
/// lone `%` at the end stays as it is.
pub fn decode_escapes(s: &str) -> String {
    if s.chars().nth(1).is_none() {
        return s.to_owned();
    }
    let mut decoded = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        let lookahead = chars.peek().copied().unwrap_or(' ');
        match replacement(lookahead) {
            Some(text) if c == ESCAPE_MARK => {
                decoded.push_str(text);
                chars.next();
            }
            _ => decoded.push(c),
        }
    }
    decoded
}
