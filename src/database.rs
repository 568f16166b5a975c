//! Assembling the decoded database from a raw tree.

use indexmap::IndexMap;
use indexmap::map::Values;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info};

use crate::row::{Row, normalize_row};
use crate::tree::RawTree;

// ------------- Table -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, rows: Vec<Row>) -> Self {
        Self { name: name.into(), rows }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// a table renders as its list of rows
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

// ------------- Database -------------
/// Decoded tables by name, in the order the dump declares them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Database {
    tables: IndexMap<String, Table>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }
    /// A table seen twice keeps its first position and its latest rows.
    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
    pub fn tables(&self) -> Values<'_, String, Table> {
        self.tables.values()
    }
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
    pub fn len(&self) -> usize {
        self.tables.len()
    }
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Table::len).sum()
    }
}

impl Serialize for Database {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for (name, table) in &self.tables {
            map.serialize_entry(name, table)?;
        }
        map.end()
    }
}

// ------------- Version -------------
pub const SCHEMA_MAJOR_VSN: &str = "schema_major_vsn";
pub const SCHEMA_MINOR_VSN: &str = "schema_minor_vsn";
pub const GENERATION_COUNT: &str = "generation_count";
pub const VERSION_KEYS: [&str; 3] = [SCHEMA_MAJOR_VSN, SCHEMA_MINOR_VSN, GENERATION_COUNT];

/// Schema version and generation count from the manifest. Keys missing from
/// the manifest stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize)]
pub struct Version {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_major_vsn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_minor_vsn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_count: Option<String>,
}

impl Version {
    /// Record a manifest pair. Returns false for keys that are not version keys.
    pub fn record(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            SCHEMA_MAJOR_VSN => &mut self.schema_major_vsn,
            SCHEMA_MINOR_VSN => &mut self.schema_minor_vsn,
            GENERATION_COUNT => &mut self.generation_count,
            _ => return false,
        };
        *slot = Some(value.to_owned());
        true
    }
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            SCHEMA_MAJOR_VSN => self.schema_major_vsn.as_deref(),
            SCHEMA_MINOR_VSN => self.schema_minor_vsn.as_deref(),
            GENERATION_COUNT => self.generation_count.as_deref(),
            _ => None,
        }
    }
    /// The keys that were found, in manifest key order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        VERSION_KEYS.into_iter().filter_map(|key| self.get(key).map(|value| (key, value)))
    }
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

// ------------- Assembly -------------
pub fn assemble(tree: &RawTree) -> (Database, Version) {
    let mut database = Database::new();
    for raw in &tree.tables {
        let rows: Vec<Row> = raw.rows.rows().iter().map(normalize_row).collect();
        debug!(table = %raw.name, rows = rows.len(), "decoded table");
        database.insert(Table::new(raw.name.as_str(), rows));
    }

    let mut version = Version::default();
    for (key, value) in &tree.manifest {
        if !version.record(key, value) {
            debug!(%key, "ignoring manifest pair");
        }
    }

    info!(tables = database.len(), rows = database.row_count(), "assembled database");
    (database, version)
}
