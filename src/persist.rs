// used for the sql output
use rusqlite::{Connection, params_from_iter};
use tracing::{debug, info};

use crate::database::{Database, Table, VERSION_KEYS, Version};
use crate::error::Result;
use crate::render::VERSION_KEY;
use crate::value::DecodedValue;

pub const DEFAULT_PRIMARY_KEY: &str = "ref";

/// Double quote an identifier for SQLite.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ------------- Persistence -------------
/// Writes a decoded database into SQLite, one table per database table.
///
/// Every column is text. Lists and records are stored as their JSON text,
/// fields a row does not have are null. Empty tables are not created since
/// there is nothing to derive their columns from.
pub struct Persistor<'db> {
    pub db: &'db Connection,
    primary_key: String,
}
impl<'db> Persistor<'db> {
    pub fn new(connection: &'db Connection) -> Persistor<'db> {
        Self::with_primary_key(connection, DEFAULT_PRIMARY_KEY)
    }
    pub fn with_primary_key(connection: &'db Connection, primary_key: &str) -> Persistor<'db> {
        Persistor {
            db: connection,
            primary_key: primary_key.to_owned(),
        }
    }
    /// Persist all tables, and the version if given, in one transaction.
    /// Returns the number of rows written.
    pub fn persist_database(&self, database: &Database, version: Option<&Version>) -> Result<usize> {
        let tx = self.db.unchecked_transaction()?;
        let mut written = 0;
        for table in database.tables() {
            if version.is_some() && table.name() == VERSION_KEY {
                continue;
            }
            written += self.persist_table(&tx, table)?;
        }
        if let Some(version) = version {
            self.persist_version(&tx, version)?;
        }
        tx.commit()?;
        info!(tables = database.len(), rows = written, "persisted database");
        Ok(written)
    }
    pub fn persist_table(&self, connection: &Connection, table: &Table) -> Result<usize> {
        if table.is_empty() {
            debug!(table = table.name(), "no rows, not creating the table");
            return Ok(0);
        }
        let columns = columns_of(table);
        let definitions: Vec<String> = columns
            .iter()
            .map(|column| {
                if *column == self.primary_key {
                    format!("{} text primary key", quote_ident(column))
                } else {
                    format!("{} text", quote_ident(column))
                }
            })
            .collect();
        connection.execute_batch(&format!(
            "create table {} (\n    {}\n) strict;",
            quote_ident(table.name()),
            definitions.join(",\n    ")
        ))?;
        let mut add_row = connection.prepare(&format!(
            "insert into {} ({}) values ({})",
            quote_ident(table.name()),
            columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
        ))?;
        for row in table.rows() {
            let values = columns
                .iter()
                .map(|column| row.get(*column).map(column_text).transpose())
                .collect::<Result<Vec<Option<String>>>>()?;
            add_row.execute(params_from_iter(values.iter()))?;
        }
        debug!(table = table.name(), rows = table.len(), columns = columns.len(), "persisted table");
        Ok(table.len())
    }
    pub fn persist_version(&self, connection: &Connection, version: &Version) -> Result<()> {
        let definitions: Vec<String> = VERSION_KEYS.iter().map(|key| format!("{} text", quote_ident(key))).collect();
        connection.execute_batch(&format!(
            "create table {} (\n    {}\n) strict;",
            quote_ident(VERSION_KEY),
            definitions.join(",\n    ")
        ))?;
        connection.execute(
            &format!("insert into {} values (?1, ?2, ?3)", quote_ident(VERSION_KEY)),
            params_from_iter(VERSION_KEYS.iter().map(|key| version.get(key))),
        )?;
        Ok(())
    }
}

// union of the field names of all rows, in first seen order
fn columns_of(table: &Table) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for row in table.rows() {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }
    columns
}

fn column_text(value: &DecodedValue) -> Result<String> {
    Ok(match value {
        DecodedValue::Scalar(s) => s.clone(),
        other => serde_json::to_string(other)?,
    })
}

// ------------- Dump -------------
/// SQL text that recreates every table of the connection with its content.
pub fn dump(connection: &Connection) -> Result<String> {
    let mut out = String::from("BEGIN TRANSACTION;\n");
    let mut all_tables = connection.prepare(
        "
        select name, sql
            from sqlite_master
            where type = 'table'
            and sql is not null
            and name not like 'sqlite_%'
            order by rowid
    ",
    )?;
    let tables = all_tables
        .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    for (name, sql) in tables {
        out.push_str(&sql);
        out.push_str(";\n");
        let mut table_info = connection.prepare(&format!("pragma table_info({})", quote_ident(&name)))?;
        let columns = table_info
            .query_map([], |r| r.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut all_rows = connection.prepare(&format!(
            "select {} from {}",
            columns.iter().map(|c| format!("quote({})", quote_ident(c))).collect::<Vec<_>>().join(", "),
            quote_ident(&name)
        ))?;
        let mut rows = all_rows.query([])?;
        while let Some(row) = rows.next()? {
            let values = (0..columns.len())
                .map(|i| row.get::<_, String>(i))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            out.push_str(&format!("INSERT INTO {} VALUES({});\n", quote_ident(&name), values.join(",")));
        }
    }
    out.push_str("COMMIT;\n");
    Ok(out)
}
