//! Turning one raw `<row>` into a [`Row`].
//!
//! Besides decoding every attribute value this module carries the two
//! structural heuristics of the dump format:
//!
//! * association lists (`(('k1' 'v1') ('k2' 'v2'))`) become records, and
//! * `last_booted_record`, which holds an XML-RPC style value written out as an
//!   s-expression of typed tuples (`('struct' ('uuid' ...) ('is_a_template'
//!   ('boolean' '0')) ...)`), is unpacked into a record of plain values.
//!
//! Both are pattern matches over untyped lists. A genuine list of two-element
//! lists is indistinguishable from an association list and is turned into a
//! record too.

use indexmap::IndexMap;
use tracing::debug;

use crate::escape::decode_escapes;
use crate::value::{DecodedValue, Mapping, decode_value};

/// A raw row as read from the dump: attribute name → attribute value.
pub type RawRow = IndexMap<String, String>;

/// A decoded row: field name → value, in attribute order.
pub type Row = IndexMap<String, DecodedValue>;

/// Attributes starting with this are bookkeeping of the database (`_ref`, `__ctime`, ...).
pub const INTERNAL_MARKER: &str = "@_";
/// Attribute names carry this prefix in the raw tree.
pub const ATTRIBUTE_MARKER: char = '@';
pub const LAST_BOOTED_RECORD: &str = "last_booted_record";

// tags of the typed tuples inside the last booted record
const STRUCT: &str = "struct";
const ARRAY: &str = "array";
const BOOLEAN: &str = "boolean";
const DOUBLE: &str = "double";
const DATE_TIME: &str = "dateTime.iso8601";

pub fn normalize_row(raw: &RawRow) -> Row {
    let mut row = Row::with_capacity(raw.len());
    for (name, raw_value) in raw {
        if is_internal(name) {
            continue;
        }
        let key = normalize_key(name);
        let mut value = decode_value(raw_value);
        if key == LAST_BOOTED_RECORD {
            value = strip_struct_marker(value);
        }
        value = promote_pairs(value);
        if key == LAST_BOOTED_RECORD {
            value = decode_boot_record(value);
        }
        row.insert(key, value);
    }
    row
}

pub fn is_internal(name: &str) -> bool {
    name.starts_with(INTERNAL_MARKER)
}

/// `@name__label` → `name_label`
pub fn normalize_key(name: &str) -> String {
    let mut key = name.trim_start_matches(ATTRIBUTE_MARKER).to_owned();
    while key.contains("__") {
        key = key.replace("__", "_");
    }
    key
}

fn strip_struct_marker(value: DecodedValue) -> DecodedValue {
    match value {
        DecodedValue::Sequence(mut items) if items.first().is_some_and(|i| i.is_atom(STRUCT)) => {
            items.remove(0);
            DecodedValue::Sequence(items)
        }
        other => other,
    }
}

// ------------- Pair promotion -------------

/// Turn a non-empty list of two-element lists into a record.
///
/// The first element of each pair has to be a scalar to serve as a key. Later
/// duplicates of a key replace the value but keep the position of the first.
pub fn promote_pairs(value: DecodedValue) -> DecodedValue {
    let DecodedValue::Sequence(items) = value else {
        return value;
    };
    if items.is_empty() || !items.iter().all(|i| i.as_sequence().is_some_and(|p| p.len() == 2)) {
        return DecodedValue::Sequence(items);
    }
    if !items.iter().all(|i| i.as_sequence().is_some_and(|p| p[0].as_scalar().is_some())) {
        debug!("list of pairs with a non-scalar key, keeping it as a list");
        return DecodedValue::Sequence(items);
    }
    let mapping: Mapping = items.into_iter().filter_map(into_pair).collect();
    DecodedValue::Mapping(mapping)
}

fn into_pair(item: DecodedValue) -> Option<(String, DecodedValue)> {
    let DecodedValue::Sequence(pair) = item else {
        return None;
    };
    let mut pair = pair.into_iter();
    match (pair.next(), pair.next()) {
        (Some(DecodedValue::Scalar(key)), Some(value)) => Some((key, value)),
        _ => None,
    }
}

// ------------- Last booted record -------------

/// Final shape of `last_booted_record`: always a record, possibly empty.
fn decode_boot_record(value: DecodedValue) -> DecodedValue {
    match value {
        DecodedValue::Mapping(entries) => DecodedValue::Mapping(decode_entries(entries)),
        other => {
            if !other.is_empty() {
                debug!(?other, "last_booted_record is not a record, replacing it with an empty one");
            }
            DecodedValue::empty_mapping()
        }
    }
}

fn decode_entries(entries: Mapping) -> Mapping {
    entries
        .into_iter()
        .map(|(key, value)| {
            let value = decode_typed(&key, value);
            (key, value)
        })
        .collect()
}

/// Decode one entry of the record by the first tag, in precedence order, that
/// its tuple contains.
fn decode_typed(key: &str, value: DecodedValue) -> DecodedValue {
    if let DecodedValue::Sequence(items) = &value {
        let tag = [STRUCT, ARRAY, BOOLEAN, DOUBLE, DATE_TIME]
            .into_iter()
            .find(|tag| items.iter().any(|i| i.is_atom(tag)));
        if let Some(tag) = tag {
            return match decode_tagged(tag, items) {
                Some(decoded) => decoded,
                None => {
                    debug!(key = %key, tag = %tag, "typed tuple without a usable payload, keeping it as is");
                    value
                }
            };
        }
    }
    if key == LAST_BOOTED_RECORD {
        // a record that contains itself, stop here
        return DecodedValue::empty_mapping();
    }
    match value {
        DecodedValue::Scalar(s) => DecodedValue::Scalar(decode_escapes(&s)),
        other => other,
    }
}

fn decode_tagged(tag: &str, items: &[DecodedValue]) -> Option<DecodedValue> {
    match tag {
        STRUCT => {
            let fields = without_tag(items, STRUCT);
            if fields.is_empty() {
                return Some(DecodedValue::empty_mapping());
            }
            match promote_pairs(DecodedValue::Sequence(fields)) {
                DecodedValue::Mapping(entries) => Some(DecodedValue::Mapping(decode_entries(entries))),
                _ => None,
            }
        }
        ARRAY => Some(DecodedValue::Sequence(without_tag(items, ARRAY))),
        BOOLEAN => payload(items).map(|p| DecodedValue::scalar(if p == "0" { "false" } else { "true" })),
        DOUBLE => payload(items)
            .and_then(|p| p.trim().parse::<f64>().ok())
            .map(|d| DecodedValue::Scalar(render_double(d))),
        DATE_TIME => payload(items).map(DecodedValue::scalar),
        _ => None,
    }
}

// everything but the first occurrence of the tag
fn without_tag(items: &[DecodedValue], tag: &str) -> Vec<DecodedValue> {
    let mut rest = items.to_vec();
    if let Some(position) = rest.iter().position(|i| i.is_atom(tag)) {
        rest.remove(position);
    }
    rest
}

/// The value carried by a typed tuple: its last element, `'0'` in `('boolean' '0')`.
fn payload(items: &[DecodedValue]) -> Option<&str> {
    items.get(1..)?.last()?.as_scalar()
}

/// Shortest round-trip rendering: `1.0`, `0.25`, `1e-05`, `1e+16`, `nan`, `-inf`.
pub fn render_double(d: f64) -> String {
    if d.is_nan() {
        return "nan".to_string();
    }
    if d.is_infinite() {
        return if d > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    // Debug switches to exponent form below 1e-4 and from 1e16 on
    let shortest = format!("{d:?}");
    match shortest.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => shortest,
    }
}
