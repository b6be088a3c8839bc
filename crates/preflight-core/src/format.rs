//! Document serialization formats and extension dispatch.

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::Error;

/// Serialization format of an OpenAPI document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Select the format from the file extension.
    ///
    /// Only `.json`, `.yml` and `.yaml` are accepted, compared case-sensitively.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yml") | Some("yaml") => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedExtension(path.to_path_buf())),
        }
    }

    /// Guess the format of a referenced document from its URL path.
    ///
    /// Returns `None` when the extension does not tell.
    pub fn from_url_path(path: &str) -> Option<Self> {
        let name = path.rsplit('/').next().unwrap_or(path);
        match name.rsplit_once('.').map(|(_, ext)| ext) {
            Some("json") => Some(Self::Json),
            Some("yml") | Some("yaml") => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Decode `data` in this format.
    ///
    /// `location` only names the source in error messages.
    pub fn decode<T: DeserializeOwned>(self, data: &[u8], location: &str) -> crate::Result<T> {
        match self {
            Self::Json => serde_json::from_slice(data).map_err(|source| Error::Json {
                location: location.to_string(),
                source,
            }),
            Self::Yaml => serde_yaml::from_slice(data).map_err(|source| Error::Yaml {
                location: location.to_string(),
                source,
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
