//! OpenAPI document service.
//!
//! The preflight pipeline never parses a full document itself. It talks to a
//! [`DocumentService`], which turns raw bytes plus a base location into a
//! [`LoadedDocument`] and validates it. [`OpenApiV3Service`] is the default
//! implementation, backed by the `openapiv3` data model.
//!
//! # Examples
//!
//! ```no_run
//! use preflight_core::format::DocumentFormat;
//! use preflight_core::location::BaseLocation;
//! use preflight_core::openapi::{DocumentService, OpenApiV3Service};
//! use preflight_core::error::Result;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let data = tokio::fs::read("openapi.yaml").await.unwrap();
//! let service = OpenApiV3Service::new();
//! let document = service
//!     .load(&data, DocumentFormat::Yaml, &BaseLocation::CurrentDir)
//!     .await?;
//! service.validate(&document)?;
//! println!("API Title: {}", document.title());
//! # Ok(())
//! # }
//! ```

mod loader;
mod refs;
mod validate;

pub use loader::OpenApiV3Service;
pub use validate::validate_document;

use async_trait::async_trait;
use openapiv3::OpenAPI;
use serde_json::Value as JsonValue;

use crate::format::DocumentFormat;
use crate::location::BaseLocation;

/// Loads and validates OpenAPI documents
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Parse `data`, resolving references relative to `base`.
    async fn load(
        &self,
        data: &[u8],
        format: DocumentFormat,
        base: &BaseLocation,
    ) -> crate::Result<LoadedDocument>;

    /// Check a loaded document against the specification rules.
    fn validate(&self, document: &LoadedDocument) -> crate::Result<()>;
}

/// A document produced by a [`DocumentService`]
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    spec: OpenAPI,
    resolved: JsonValue,
    source: JsonValue,
}

impl LoadedDocument {
    /// Build a document from its typed model, its resolved tree, and the tree
    /// as decoded before any reference was resolved.
    pub fn new(spec: OpenAPI, resolved: JsonValue, source: JsonValue) -> Self {
        Self {
            spec,
            resolved,
            source,
        }
    }

    /// The typed document model
    pub fn spec(&self) -> &OpenAPI {
        &self.spec
    }

    /// The document with external references inlined
    pub fn as_json(&self) -> &JsonValue {
        &self.resolved
    }

    /// The document exactly as decoded
    pub fn source(&self) -> &JsonValue {
        &self.source
    }

    /// Get the declared OpenAPI version
    pub fn openapi_version(&self) -> &str {
        &self.spec.openapi
    }

    /// Get the title of the API
    pub fn title(&self) -> &str {
        &self.spec.info.title
    }

    /// Get the version of the API
    pub fn version(&self) -> &str {
        &self.spec.info.version
    }
}
