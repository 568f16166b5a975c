//! JSON output.
//!
//! The database renders as one object with a key per table, each holding the
//! list of its rows. Scalars become strings, lists arrays, records objects. When
//! asked for, the version goes under [`VERSION_KEY`].

use std::io::Write;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::database::{Database, Version};
use crate::error::Result;

pub const VERSION_KEY: &str = "_version";

/// The rendered document: the tables and, optionally, the version.
pub struct Document<'a> {
    pub database: &'a Database,
    pub version: Option<&'a Version>,
}

impl<'a> Document<'a> {
    pub fn new(database: &'a Database, version: Option<&'a Version>) -> Self {
        Self { database, version }
    }
}

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for table in self.database.tables() {
            // the version takes the place of a table with the same name
            if self.version.is_some() && table.name() == VERSION_KEY {
                continue;
            }
            map.serialize_entry(table.name(), table)?;
        }
        if let Some(version) = self.version {
            map.serialize_entry(VERSION_KEY, version)?;
        }
        map.end()
    }
}

pub fn to_json(database: &Database, version: Option<&Version>) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(Document::new(database, version))?)
}

/// Pretty print the document with `indent` spaces per level.
pub fn write_json<W: Write>(writer: W, database: &Database, version: Option<&Version>, indent: usize) -> Result<()> {
    let indent = " ".repeat(indent);
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    Document::new(database, version).serialize(&mut serializer)?;
    // a buffered writer only reports a failed write on flush
    serializer.into_inner().flush()?;
    debug!(tables = database.len(), "wrote json");
    Ok(())
}

pub fn to_json_string(database: &Database, version: Option<&Version>, indent: usize) -> Result<String> {
    let mut out = Vec::new();
    write_json(&mut out, database, version, indent)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}
