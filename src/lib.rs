//! xapidb – decoding XML dumps of the XAPI database.
//!
//! The XAPI database (the control-plane store of a Xen toolstack host) can be
//! exported as XML: a manifest with version metadata and one `<table>` per
//! object class whose `<row>` elements carry every field as a string attribute.
//! Strings are not all plain strings though. Three encodings are layered on top
//! of each other:
//! * a percent-escape scheme protecting whitespace and `%` ([`escape`]),
//! * s-expressions for lists and records, `(('key' 'value') ...)` ([`value`]),
//! * typed tuples, `('boolean' '0')`, inside `last_booted_record` ([`row`]).
//!
//! This crate reverses them and returns a [`database::Database`] of tables of
//! rows, with a [`database::Version`] taken from the manifest.
//!
//! ## Modules
//! * [`tree`] – The raw tree of a dump and the XML reader producing it.
//! * [`escape`] – Percent-escape decoding.
//! * [`value`] – [`value::DecodedValue`] and the s-expression decoder (grammar in `sexpr.pest`).
//! * [`row`] – Row normalization: field names, pair promotion, the last booted record.
//! * [`database`] – Tables, the database, the version, and their assembly.
//! * [`render`] – JSON output.
//! * [`persist`] – SQLite output.
//! * [`settings`] – Layered configuration of the command line tool.
//!
//! ## Failure policy
//! Decoding is total. A value that looks like an s-expression but does not
//! parse stays a string, a heuristic that does not apply leaves the value as
//! it was, a table without rows is an empty table. Errors ([`error::XapiError`])
//! only come from reading the dump and writing output.
//!
//! ## Quick Start
//! ```
//! use xapidb::{decode_database, tree::XmlStr};
//! let xml = r#"<database>
//!   <manifest><pair key="schema_major_vsn" value="5"/></manifest>
//!   <table name="VM"><row ref="OpaqueRef:1" _ref="OpaqueRef:1" name__label="'vm%.one'"/></table>
//! </database>"#;
//! let (db, version) = decode_database(&XmlStr(xml)).unwrap();
//! let vm = &db.get("VM").unwrap().rows()[0];
//! assert_eq!(vm["name_label"].as_scalar(), Some("vm one"));
//! assert_eq!(version.schema_major_vsn.as_deref(), Some("5"));
//! ```

pub mod database;
pub mod error;
pub mod escape;
pub mod persist;
pub mod render;
pub mod row;
pub mod settings;
pub mod tree;
pub mod value;

use std::path::Path;

pub use database::{Database, Table, Version, assemble};
pub use error::{Result, XapiError};
pub use value::{DecodedValue, decode_value};

use tree::{TreeProvider, XmlFile};

/// Decode the tree handed over by `provider`.
pub fn decode_database<P: TreeProvider + ?Sized>(provider: &P) -> Result<(Database, Version)> {
    let tree = provider.raw_tree()?;
    Ok(assemble(&tree))
}

/// Decode the dump at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<(Database, Version)> {
    decode_database(&XmlFile::new(path))
}
