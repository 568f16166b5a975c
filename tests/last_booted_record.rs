use xapidb::row::{LAST_BOOTED_RECORD, RawRow, normalize_row};
use xapidb::value::{DecodedValue, Mapping};

fn boot_record(encoded: &str) -> DecodedValue {
    let mut raw = RawRow::new();
    raw.insert("@uuid".to_string(), "0000".to_string());
    raw.insert("@last__booted__record".to_string(), encoded.to_string());
    let mut row = normalize_row(&raw);
    row.shift_remove(LAST_BOOTED_RECORD).expect("last_booted_record present")
}

fn record(entries: &[(&str, DecodedValue)]) -> DecodedValue {
    DecodedValue::Mapping(entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect::<Mapping>())
}

fn scalar(s: &str) -> DecodedValue {
    DecodedValue::scalar(s)
}

#[test]
fn boolean_entries() {
    assert_eq!(boot_record("(struct (foo (boolean 1 0)))"), record(&[("foo", scalar("false"))]));
    assert_eq!(
        boot_record("('struct' ('is_a_template' ('boolean' '0')) ('is_control_domain' ('boolean' '1')))"),
        record(&[("is_a_template", scalar("false")), ("is_control_domain", scalar("true"))])
    );
}

#[test]
fn date_time_entries() {
    assert_eq!(
        boot_record(r#"(struct (ts (dateTime.iso8601 1 "2020-01-01T00:00:00Z")))"#),
        record(&[("ts", scalar("2020-01-01T00:00:00Z"))])
    );
    assert_eq!(
        boot_record("('struct' ('snapshot_time' ('dateTime.iso8601' '19700101T00:00:00Z')))"),
        record(&[("snapshot_time", scalar("19700101T00:00:00Z"))])
    );
}

#[test]
fn double_entries() {
    assert_eq!(
        boot_record("('struct' ('memory_overhead' ('double' '1')) ('ratio' ('double' '0.25')))"),
        record(&[("memory_overhead", scalar("1.0")), ("ratio", scalar("0.25"))])
    );
}

#[test]
fn unparsable_double_is_kept() {
    assert_eq!(
        boot_record("('struct' ('ratio' ('double' 'lots')))"),
        record(&[("ratio", DecodedValue::Sequence(vec![scalar("double"), scalar("lots")]))])
    );
}

#[test]
fn array_entries() {
    assert_eq!(
        boot_record("('struct' ('allowed_operations' ('array' 'start' 'clone')) ('blocked' ('array')))"),
        record(&[
            ("allowed_operations", DecodedValue::Sequence(vec![scalar("start"), scalar("clone")])),
            ("blocked", DecodedValue::Sequence(vec![])),
        ])
    );
}

#[test]
fn nested_structs_become_records() {
    assert_eq!(
        boot_record(
            "('struct' ('other_config' ('struct' ('mac_seed' 'abc') ('flag' ('boolean' '0')))) ('platform' ('struct')))"
        ),
        record(&[
            ("other_config", record(&[("mac_seed", scalar("abc")), ("flag", scalar("false"))])),
            ("platform", record(&[])),
        ])
    );
}

#[test]
fn struct_takes_precedence_over_other_tags() {
    assert_eq!(
        boot_record("('struct' ('x' ('struct' ('boolean' 'array'))))"),
        record(&[("x", record(&[("boolean", scalar("array"))]))])
    );
}

#[test]
fn plain_entries_are_escape_decoded() {
    assert_eq!(
        boot_record("('struct' ('name_label' 'my%%.vm') ('uuid' 'abc'))"),
        record(&[("name_label", scalar("my vm")), ("uuid", scalar("abc"))])
    );
}

#[test]
fn untagged_lists_are_kept() {
    assert_eq!(
        boot_record("('struct' ('tags' ('a' 'b' 'c')))"),
        record(&[("tags", DecodedValue::Sequence(vec![scalar("a"), scalar("b"), scalar("c")]))])
    );
}

#[test]
fn self_reference_is_cut() {
    assert_eq!(
        boot_record("('struct' ('last_booted_record' '') ('uuid' 'abc'))"),
        record(&[("last_booted_record", record(&[])), ("uuid", scalar("abc"))])
    );
}

#[test]
fn empty_record() {
    assert_eq!(boot_record("''"), record(&[]));
    assert_eq!(boot_record(""), record(&[]));
    assert_eq!(boot_record("()"), record(&[]));
    assert_eq!(boot_record("('struct')"), record(&[]));
}

#[test]
fn record_that_is_not_a_record_is_emptied() {
    assert_eq!(boot_record("garbage"), record(&[]));
    assert_eq!(boot_record("('a' 'b' 'c')"), record(&[]));
}

#[test]
fn struct_marker_is_only_stripped_from_the_boot_record() {
    let mut raw = RawRow::new();
    raw.insert("@other".to_string(), "('struct' ('a' 'b'))".to_string());
    let row = normalize_row(&raw);
    assert_eq!(
        row["other"],
        DecodedValue::Sequence(vec![scalar("struct"), DecodedValue::Sequence(vec![scalar("a"), scalar("b")])])
    );
}

#[test]
fn double_exponents_and_specials() {
    assert_eq!(
        boot_record("('struct' ('small' ('double' '1e-05')) ('large' ('double' '1e16')) ('huge' ('double' '1.5e300')))"),
        record(&[("small", scalar("1e-05")), ("large", scalar("1e+16")), ("huge", scalar("1.5e+300"))])
    );
    assert_eq!(
        boot_record("('struct' ('a' ('double' 'nan')) ('b' ('double' '-inf')) ('c' ('double' '123456789012345.0')))"),
        record(&[("a", scalar("nan")), ("b", scalar("-inf")), ("c", scalar("123456789012345.0"))])
    );
}
