//! Default [`DocumentService`] backed by the `openapiv3` data model.

use async_trait::async_trait;
use openapiv3::OpenAPI;
use serde_json::Value as JsonValue;

use super::refs::RefResolver;
use super::{validate, DocumentService, LoadedDocument};
use crate::format::DocumentFormat;
use crate::location::BaseLocation;
use crate::Error;

/// Loads OpenAPI 3.0 documents, following external references over `file://`
/// and `http(s)://`.
#[derive(Debug, Clone, Default)]
pub struct OpenApiV3Service {
    client: reqwest::Client,
}

impl OpenApiV3Service {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured HTTP client for remote references
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DocumentService for OpenApiV3Service {
    async fn load(
        &self,
        data: &[u8],
        format: DocumentFormat,
        base: &BaseLocation,
    ) -> crate::Result<LoadedDocument> {
        let base = base.to_url()?;
        let source: JsonValue = format.decode(data, base.as_str())?;

        let mut resolver = RefResolver::new(&self.client, base.clone(), source.clone());
        resolver.fetch_all().await?;
        let resolved = resolver.resolve()?;

        let spec: OpenAPI = serde_json::from_value(resolved.clone()).map_err(|e| {
            Error::openapi(format!("Failed to parse OpenAPI spec at {}: {}", base, e))
        })?;
        log::debug!("Loaded '{}' ({} paths)", spec.info.title, spec.paths.paths.len());

        Ok(LoadedDocument::new(spec, resolved, source))
    }

    fn validate(&self, document: &LoadedDocument) -> crate::Result<()> {
        validate::validate_document(document)
    }
}
