//! Error handling for the preflight library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. Every variant carries the
//! context needed to report it, and [`Error::kind`] groups the variants so
//! callers can branch on the failure class without matching message text.
//!
//! # Examples
//!
//! ```
//! use preflight_core::error::{Error, ErrorKind, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::invalid_data("neither 'swagger' nor 'openapi' is set"))
//! }
//!
//! assert_eq!(might_fail().unwrap_err().kind(), ErrorKind::Semantic);
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Result type for preflight operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes, one per stage of the preflight pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing root or document, unusable path, bad configuration
    Input,
    /// A file or remote document could not be read
    Io,
    /// The file extension does not name a supported format
    Format,
    /// JSON or YAML syntax error
    Decode,
    /// Missing, ambiguous or unsupported version discriminator
    Semantic,
    /// Reference resolution or typed decode failed
    Load,
    /// The document service rejected the document
    Validation,
}

/// Main error type for preflight operations
#[derive(Debug, Error)]
pub enum Error {
    /// Root directory does not exist
    #[error("root directory {} does not exist", .0.display())]
    RootNotFound(PathBuf),

    /// Document does not exist
    #[error("document {} does not exist", .0.display())]
    DocumentNotFound(PathBuf),

    /// A path could not be turned into an absolute path or a base URL
    #[error("cannot resolve location of {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error reading {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote document could not be fetched
    #[error("failed to fetch {location}: {reason}")]
    Fetch { location: String, reason: String },

    /// File extension is not one of `.json`, `.yml`, `.yaml`
    #[error("Unsupported file extension: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    /// JSON parsing error
    #[error("JSON parsing error in {location}: {source}")]
    Json {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing error
    #[error("YAML parsing error in {location}: {source}")]
    Yaml {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Version discriminator missing or contradictory
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Swagger/OpenAPI 2.0 documents are never loaded
    #[error("Unsupported Swagger/OpenAPI 2.0 (swagger: {0})")]
    UnsupportedSwagger(String),

    /// A `$ref` could not be resolved
    #[error("unresolved $ref '{reference}': {reason}")]
    Reference { reference: String, reason: String },

    /// OpenAPI error
    #[error("OpenAPI error: {0}")]
    OpenApi(String),

    /// Validation found one or more problems
    #[error("validation failed: {}", .issues.join("; "))]
    Validation { issues: Vec<String> },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new OpenAPI error
    pub fn openapi<S: Into<String>>(msg: S) -> Self {
        Self::OpenApi(msg.into())
    }

    /// Create a new invalid data error
    pub fn invalid_data<S: Into<String>>(msg: S) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a new unresolved reference error
    pub fn reference<R: Into<String>, S: Into<String>>(reference: R, reason: S) -> Self {
        Self::Reference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    pub fn io<L: Into<String>>(location: L, source: std::io::Error) -> Self {
        Self::Io {
            location: location.into(),
            source,
        }
    }

    /// The failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RootNotFound(_)
            | Self::DocumentNotFound(_)
            | Self::InvalidPath { .. }
            | Self::Config(_) => ErrorKind::Input,
            Self::Io { .. } | Self::Fetch { .. } => ErrorKind::Io,
            Self::UnsupportedExtension(_) => ErrorKind::Format,
            Self::Json { .. } | Self::Yaml { .. } => ErrorKind::Decode,
            Self::InvalidData(_) | Self::UnsupportedSwagger(_) => ErrorKind::Semantic,
            Self::Reference { .. } | Self::OpenApi(_) => ErrorKind::Load,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }
}
