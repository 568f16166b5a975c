use xapidb::error::XapiError;
use xapidb::tree::{RowContent, TreeProvider, XmlFile, XmlStr, parse_tree};
use xapidb::value::DecodedValue;
use xapidb::{decode_database, load};

const DUMP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<database>
  <manifest>
    <pair key="schema_major_vsn" value="5"/>
    <pair key="schema_minor_vsn" value="109"/>
    <pair key="generation_count" value="941255"/>
    <pair key="xapi_major_vsn" value="1"/>
  </manifest>
  <table name="VM"/>
  <table name="host">
    <row ref="OpaqueRef:h1" _ref="OpaqueRef:h1" __ctime="1" __mtime="2" uuid="h1" name__label="'host%.one'" other__config="(('agent_start_time' '1.5') ('iscsi_iqn' 'iqn.2020-01.com.example:abc'))"/>
  </table>
  <table name="VM_metrics">
    <row ref="OpaqueRef:m1" uuid="m1" VCPUs__number="2"></row>
    <row ref="OpaqueRef:m2" uuid="m2" VCPUs__number="4"/>
  </table>
  <table name="pool">
    <row ref="OpaqueRef:p1" name__description="Tom &amp; Jerry" last__booted__record="''"/>
  </table>
</database>
"#;

#[test]
fn row_content_mirrors_the_document() {
    let tree = parse_tree(DUMP).expect("parse");
    let names: Vec<&str> = tree.tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["VM", "host", "VM_metrics", "pool"]);
    assert_eq!(tree.tables[0].rows, RowContent::Absent);
    assert!(matches!(tree.tables[1].rows, RowContent::Single(_)));
    assert!(matches!(tree.tables[2].rows, RowContent::Many(ref rows) if rows.len() == 2));
    assert_eq!(tree.manifest.len(), 4);
}

#[test]
fn attributes_keep_the_marker_and_order() {
    let tree = parse_tree(DUMP).expect("parse");
    let host = &tree.tables[1].rows.rows()[0];
    let keys: Vec<&str> = host.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["@ref", "@_ref", "@__ctime", "@__mtime", "@uuid", "@name__label", "@other__config"]
    );
}

#[test]
fn xml_entities_are_unescaped() {
    let tree = parse_tree(DUMP).expect("parse");
    let pool = &tree.tables[3].rows.rows()[0];
    assert_eq!(pool["@name__description"], "Tom & Jerry");
}

#[test]
fn decode_whole_document() {
    let (db, version) = decode_database(&XmlStr(DUMP)).expect("decode");
    assert_eq!(db.table_names().collect::<Vec<_>>(), vec!["VM", "host", "VM_metrics", "pool"]);
    assert!(db.get("VM").unwrap().is_empty());

    let host = &db.get("host").unwrap().rows()[0];
    assert_eq!(host.keys().map(String::as_str).collect::<Vec<_>>(), vec!["ref", "uuid", "name_label", "other_config"]);
    assert_eq!(host["name_label"], DecodedValue::scalar("host one"));
    let other_config = host["other_config"].as_mapping().expect("record");
    assert_eq!(other_config["iscsi_iqn"], DecodedValue::scalar("iqn.2020-01.com.example:abc"));

    let metrics = db.get("VM_metrics").unwrap();
    assert_eq!(metrics.len(), 2);
    assert_eq!(metrics.rows()[1]["VCPUs_number"], DecodedValue::scalar("4"));

    let pool = &db.get("pool").unwrap().rows()[0];
    assert_eq!(pool["last_booted_record"], DecodedValue::empty_mapping());

    assert_eq!(version.schema_major_vsn.as_deref(), Some("5"));
    assert_eq!(version.schema_minor_vsn.as_deref(), Some("109"));
    assert_eq!(version.generation_count.as_deref(), Some("941255"));
}

#[test]
fn load_from_file() {
    let path = std::env::temp_dir().join("xapidb_load_from_file.xml");
    std::fs::write(&path, DUMP).expect("write dump");
    let (db, version) = load(&path).expect("load");
    assert_eq!(db.len(), 4);
    assert_eq!(version.generation_count.as_deref(), Some("941255"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_file() {
    let path = std::env::temp_dir().join("xapidb_does_not_exist.xml");
    let err = XmlFile::new(&path).raw_tree().unwrap_err();
    assert!(matches!(err, XapiError::SourceNotFound { .. }));
    assert!(err.to_string().contains("unable to find the database file"));
}

#[test]
fn malformed_xml() {
    let err = parse_tree("<database><table name=\"VM\"><row ref=\"x\"></table></database>").unwrap_err();
    assert!(matches!(err, XapiError::Xml { .. }), "unexpected error {err}");
}

#[test]
fn table_without_name() {
    let err = parse_tree("<database><table><row ref=\"x\"/></table></database>").unwrap_err();
    assert!(err.to_string().contains("without a name"));
}

#[test]
fn rows_outside_tables_are_ignored() {
    let tree = parse_tree("<database><row ref=\"x\"/><table name=\"VM\"/></database>").expect("parse");
    assert_eq!(tree.tables.len(), 1);
    assert_eq!(tree.tables[0].rows, RowContent::Absent);
}

#[test]
fn no_manifest_means_no_version() {
    let (db, version) = decode_database(&XmlStr("<database><table name=\"VM\"></table></database>")).expect("decode");
    assert_eq!(db.len(), 1);
    assert!(version.is_empty());
}
