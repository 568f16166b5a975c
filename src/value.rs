//! Field values after decoding.
//!
//! Every attribute in the dump is a string. Some of those strings are
//! s-expressions (`('a' 'b')`, `(('k' 'v'))`, ...) which are parsed here into a
//! [`DecodedValue`]. Anything that does not parse is kept as a plain string:
//! decoding a value never fails.

use indexmap::IndexMap;
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;
use serde::Serialize;
use tracing::debug;

use crate::escape::decode_escapes;

#[derive(Parser)]
#[grammar = "sexpr.pest"]
struct SexprParser;

pub type Mapping = IndexMap<String, DecodedValue>;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Scalar(String),
    Sequence(Vec<DecodedValue>),
    Mapping(Mapping),
}

impl DecodedValue {
    pub fn scalar(s: impl Into<String>) -> Self {
        Self::Scalar(s.into())
    }
    pub fn empty_mapping() -> Self {
        Self::Mapping(Mapping::new())
    }
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_sequence(&self) -> Option<&[DecodedValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }
    /// True for the empty string, the empty list and the empty record.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Scalar(s) => s.is_empty(),
            Self::Sequence(items) => items.is_empty(),
            Self::Mapping(mapping) => mapping.is_empty(),
        }
    }
    /// True if this is a scalar equal to `atom`.
    pub fn is_atom(&self, atom: &str) -> bool {
        self.as_scalar() == Some(atom)
    }
}

impl From<&str> for DecodedValue {
    fn from(s: &str) -> Self {
        Self::Scalar(s.to_owned())
    }
}

// ------------- Classification -------------

/// `(C)` at the start of a value is a copyright notice, not a list.
const COPYRIGHT_PREFIX: &str = "(C)";

pub fn is_compound(raw: &str) -> bool {
    raw.starts_with('(') && !raw.starts_with(COPYRIGHT_PREFIX)
}

/// Decode one raw attribute value.
pub fn decode_value(raw: &str) -> DecodedValue {
    if is_compound(raw) {
        // single quotes delimit strings in the dump, the grammar only knows double quotes
        let normalized = decode_escapes(&raw.replace('\'', "\""));
        match parse_sexpr(&normalized) {
            Some(value) => return value,
            None => debug!(raw = %raw, "value looks like an s-expression but does not parse, keeping it as a string"),
        }
    }
    decode_literal(raw)
}

/// A plain string: one pair of enclosing `'` is dropped, escapes are decoded.
pub fn decode_literal(raw: &str) -> DecodedValue {
    let unquoted = raw.strip_prefix('\'').unwrap_or(raw);
    let unquoted = unquoted.strip_suffix('\'').unwrap_or(unquoted);
    DecodedValue::Scalar(decode_escapes(unquoted))
}

fn parse_sexpr(s: &str) -> Option<DecodedValue> {
    let mut document = SexprParser::parse(Rule::document, s).ok()?;
    let list = document.next()?.into_inner().next()?;
    Some(build(list))
}

fn build(pair: Pair<Rule>) -> DecodedValue {
    match pair.as_rule() {
        Rule::list => DecodedValue::Sequence(pair.into_inner().map(build).collect()),
        Rule::string => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
            DecodedValue::Scalar(unescape_string(inner))
        }
        _ => DecodedValue::Scalar(pair.as_str().to_owned()),
    }
}

// a backslash keeps the character after it
fn unescape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}
