use std::path::PathBuf;

use thiserror::Error;

/// Failures of the outer layers: reading the dump, writing output, configuration.
///
/// The decoding core never produces one of these. Anything ambiguous inside a
/// field value is resolved in place (see [`crate::value`] and [`crate::row`]).
#[derive(Error, Debug)]
pub enum XapiError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("unable to find the database file '{}'", .path.display())]
    SourceNotFound { path: PathBuf },
    #[error("the output file '{}' already exists and is a folder", .path.display())]
    OutputIsDirectory { path: PathBuf },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {message}")]
    Xml { message: String, position: Option<usize> },
    #[error("Persistence error: {0}")]
    Persistence(String),
    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, XapiError>;

// Helper conversions
impl From<rusqlite::Error> for XapiError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}
impl From<serde_json::Error> for XapiError {
    fn from(e: serde_json::Error) -> Self { Self::Render(e.to_string()) }
}
impl From<config::ConfigError> for XapiError {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
impl From<quick_xml::Error> for XapiError {
    fn from(e: quick_xml::Error) -> Self { Self::Xml { message: e.to_string(), position: None } }
}
