//! The raw tree of an XAPI database dump and the readers that produce it.
//!
//! A dump looks like
//!
//! ```xml
//! <database>
//!   <manifest>
//!     <pair key="schema_major_vsn" value="5"/>
//!     ...
//!   </manifest>
//!   <table name="VM">
//!     <row ref="OpaqueRef:..." _ref="OpaqueRef:..." name__label="..." .../>
//!   </table>
//! </database>
//! ```
//!
//! Row attributes enter the tree with an `@` in front of their name, the way a
//! generic XML-to-tree conversion reports attributes. Nothing is decoded here.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use crate::error::{Result, XapiError};
use crate::row::{ATTRIBUTE_MARKER, RawRow};

/// Rows of a table as the tree conversion hands them over: nothing, a single
/// row, or a list of rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowContent {
    #[default]
    Absent,
    Single(RawRow),
    Many(Vec<RawRow>),
}

impl RowContent {
    /// The rows as a list, whichever form they came in.
    pub fn rows(&self) -> &[RawRow] {
        match self {
            RowContent::Absent => &[],
            RowContent::Single(row) => std::slice::from_ref(row),
            RowContent::Many(rows) => rows,
        }
    }
}

impl From<Vec<RawRow>> for RowContent {
    fn from(mut rows: Vec<RawRow>) -> Self {
        match rows.len() {
            0 => RowContent::Absent,
            1 => RowContent::Single(rows.remove(0)),
            _ => RowContent::Many(rows),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub rows: RowContent,
}

impl RawTable {
    pub fn new(name: impl Into<String>, rows: RowContent) -> Self {
        Self { name: name.into(), rows }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTree {
    pub tables: Vec<RawTable>,
    /// `(key, value)` pairs of the manifest, in document order.
    pub manifest: Vec<(String, String)>,
}

/// Source of a [`RawTree`].
pub trait TreeProvider {
    fn raw_tree(&self) -> Result<RawTree>;
}

impl TreeProvider for RawTree {
    fn raw_tree(&self) -> Result<RawTree> {
        Ok(self.clone())
    }
}

/// A dump on disk.
#[derive(Debug, Clone)]
pub struct XmlFile {
    path: PathBuf,
}

impl XmlFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl TreeProvider for XmlFile {
    fn raw_tree(&self) -> Result<RawTree> {
        if !self.path.is_file() {
            return Err(XapiError::SourceNotFound { path: self.path.clone() });
        }
        let xml = fs::read_to_string(&self.path)?;
        debug!(path = %self.path.display(), bytes = xml.len(), "read database dump");
        parse_tree(&xml)
    }
}

/// A dump already in memory.
#[derive(Debug, Clone, Copy)]
pub struct XmlStr<'a>(pub &'a str);

impl TreeProvider for XmlStr<'_> {
    fn raw_tree(&self) -> Result<RawTree> {
        parse_tree(self.0)
    }
}

// ------------- Parsing -------------

struct PendingTable {
    name: String,
    rows: Vec<RawRow>,
}

impl PendingTable {
    fn finish(self) -> RawTable {
        RawTable::new(self.name, RowContent::from(self.rows))
    }
}

/// Read an XML dump into a [`RawTree`].
///
/// Only `<table>`, `<row>`, `<manifest>` and `<pair>` matter; everything else is
/// skipped.
pub fn parse_tree(xml: &str) -> Result<RawTree> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut tree = RawTree::default();
    let mut current: Option<PendingTable> = None;
    let mut in_manifest = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"table" => {
                    if let Some(open) = current.take() {
                        tree.tables.push(open.finish());
                    }
                    current = Some(PendingTable { name: table_name(e)?, rows: Vec::new() });
                }
                b"row" => push_row(&mut current, e)?,
                b"manifest" => in_manifest = true,
                b"pair" if in_manifest => push_pair(&mut tree, e)?,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"table" => {
                    let name = table_name(e)?;
                    tree.tables.push(RawTable::new(name, RowContent::Absent));
                }
                b"row" => push_row(&mut current, e)?,
                b"pair" if in_manifest => push_pair(&mut tree, e)?,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"table" => {
                    if let Some(table) = current.take() {
                        tree.tables.push(table.finish());
                    }
                }
                b"manifest" => in_manifest = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(XapiError::Xml {
                    message: err.to_string(),
                    position: Some(reader.buffer_position()),
                });
            }
            _ => {}
        }
        buf.clear();
    }
    if let Some(table) = current.take() {
        warn!(table = %table.name, "table not closed at end of document");
        tree.tables.push(table.finish());
    }

    debug!(tables = tree.tables.len(), pairs = tree.manifest.len(), "parsed database dump");
    Ok(tree)
}

fn table_name(event: &BytesStart<'_>) -> Result<String> {
    attribute_value(event, b"name")?.ok_or_else(|| XapiError::Xml {
        message: "table without a name attribute".to_string(),
        position: None,
    })
}

fn push_row(current: &mut Option<PendingTable>, event: &BytesStart<'_>) -> Result<()> {
    let Some(table) = current.as_mut() else {
        warn!("row outside of a table, skipping it");
        return Ok(());
    };
    let mut row = RawRow::new();
    for attr in event.attributes() {
        let attr = attr.map_err(|err| xml_error(err.to_string()))?;
        let name = String::from_utf8_lossy(attr.key.as_ref());
        let value = attr.unescape_value()?;
        row.insert(format!("{ATTRIBUTE_MARKER}{name}"), value.into_owned());
    }
    table.rows.push(row);
    Ok(())
}

fn push_pair(tree: &mut RawTree, event: &BytesStart<'_>) -> Result<()> {
    match (attribute_value(event, b"key")?, attribute_value(event, b"value")?) {
        (Some(key), Some(value)) => tree.manifest.push((key, value)),
        (key, _) => warn!(?key, "manifest pair without key or value, skipping it"),
    }
    Ok(())
}

fn attribute_value(event: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in event.attributes() {
        let attr = attr.map_err(|err| xml_error(err.to_string()))?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn xml_error(message: String) -> XapiError {
    XapiError::Xml { message, position: None }
}
