//! The preflight pipeline.
//!
//! `resolve paths -> pick format -> read -> sniff version -> load -> [validate]`
//!
//! Every step either hands its result to the next or stops the run with an
//! [`Error`](crate::Error). Nothing is retried.

use std::io::{self, Write};
use std::path::Path;

use tokio::fs;

use crate::config::{PreflightConfig, ReportMode};
use crate::format::DocumentFormat;
use crate::location::{BaseStrategy, DocumentReference, WorkingDirGuard};
use crate::openapi::{DocumentService, LoadedDocument, OpenApiV3Service};
use crate::report::{self, RefExtension};
use crate::version::{self, VersionDiscriminator};
use crate::Error;

/// Runs the preflight pipeline against a [`DocumentService`]
#[derive(Debug, Clone)]
pub struct Preflight<S = OpenApiV3Service> {
    config: PreflightConfig,
    service: S,
}

impl Preflight<OpenApiV3Service> {
    /// Create a pipeline using the default document service
    pub fn new(config: PreflightConfig) -> Self {
        Self::with_service(config, OpenApiV3Service::new())
    }
}

impl<S: DocumentService> Preflight<S> {
    pub fn with_service(config: PreflightConfig, service: S) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &PreflightConfig {
        &self.config
    }

    /// Check the document at `path`.
    pub async fn check<P: AsRef<Path>>(&self, path: P) -> crate::Result<CheckOutcome> {
        let reference = DocumentReference::resolve(path, self.config.root_dir.as_deref())?;
        let format = DocumentFormat::from_path(reference.path())?;

        let location = reference.path().display().to_string();
        log::debug!(
            "Checking {} ({} document, root {})",
            location,
            format,
            reference.root().display()
        );
        let data = fs::read(reference.path())
            .await
            .map_err(|e| Error::io(location.as_str(), e))?;

        let version = version::sniff(&data, format, &location)?;
        log::debug!(
            "{} declares OpenAPI {}",
            location,
            version.openapi_version()
        );

        let document = self.load(&reference, &data, format).await?;

        if self.config.validate {
            self.service.validate(&document)?;
            log::debug!("{} passed validation", location);
        }

        let ref_extensions = if self.config.scan_refs {
            report::ref_extensions(&document)
        } else {
            Vec::new()
        };

        Ok(CheckOutcome {
            reference,
            format,
            version,
            document,
            validated: self.config.validate,
            ref_extensions,
        })
    }

    async fn load(
        &self,
        reference: &DocumentReference,
        data: &[u8],
        format: DocumentFormat,
    ) -> crate::Result<LoadedDocument> {
        let base = reference.base_location(self.config.base_strategy)?;
        match self.config.base_strategy {
            BaseStrategy::Explicit => self.service.load(data, format, &base).await,
            BaseStrategy::WorkingDirectory => {
                let _guard = WorkingDirGuard::enter(reference.parent_dir())?;
                self.service.load(data, format, &base).await
            }
        }
    }
}

/// Everything a successful run produced
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub reference: DocumentReference,
    pub format: DocumentFormat,
    pub version: VersionDiscriminator,
    pub document: LoadedDocument,
    /// Whether the document went through validation
    pub validated: bool,
    /// `$ref` keys found on path items (empty when scanning is off)
    pub ref_extensions: Vec<RefExtension>,
}

impl CheckOutcome {
    /// Write the report selected by `mode`.
    pub fn write_report<W: Write>(&self, out: &mut W, mode: ReportMode) -> io::Result<()> {
        match mode {
            ReportMode::Summary => report::write_summary(out, &self.document),
            ReportMode::Raw => report::write_raw(out, &self.document),
            ReportMode::None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::tests::lock_cwd;
    use crate::location::BaseLocation;
    use crate::ErrorKind;
    use async_trait::async_trait;
    use openapiv3::OpenAPI;
    use serde_json::Value as JsonValue;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    /// Records calls and decodes without resolving anything
    #[derive(Default, Clone)]
    struct CountingService {
        loads: Arc<AtomicUsize>,
        validations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DocumentService for CountingService {
        async fn load(
            &self,
            data: &[u8],
            format: DocumentFormat,
            _base: &BaseLocation,
        ) -> crate::Result<LoadedDocument> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let json: JsonValue = format.decode(data, "test")?;
            let spec: OpenAPI =
                serde_json::from_value(json.clone()).map_err(|e| Error::openapi(e.to_string()))?;
            Ok(LoadedDocument::new(spec, json.clone(), json))
        }

        fn validate(&self, _document: &LoadedDocument) -> crate::Result<()> {
            self.validations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn config_for(dir: &TempDir) -> PreflightConfig {
        PreflightConfig {
            root_dir: Some(dir.path().to_path_buf()),
            ..PreflightConfig::default()
        }
    }

    const DEMO: &str = r#"{"openapi": "3.0.0", "info": {"title": "Demo", "version": "1.0.0"}, "paths": {}}"#;

    #[tokio::test]
    async fn test_openapi_document_is_loaded_and_validated() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "spec.json", DEMO);
        let service = CountingService::default();
        let preflight = Preflight::with_service(config_for(&dir), service.clone());

        let outcome = preflight.check(&path).await.unwrap();
        assert_eq!(outcome.version.openapi_version(), "3.0.0");
        assert_eq!(outcome.format, DocumentFormat::Json);
        assert_eq!(outcome.reference.root(), preflight.config().root_dir.as_deref().unwrap());
        assert!(outcome.validated);
        assert_eq!(service.loads.load(Ordering::SeqCst), 1);
        assert_eq!(service.validations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_can_be_skipped() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "spec.json", DEMO);
        let service = CountingService::default();
        let config = PreflightConfig {
            validate: false,
            ..config_for(&dir)
        };

        let outcome = Preflight::with_service(config, service.clone())
            .check(&path)
            .await
            .unwrap();
        assert!(!outcome.validated);
        assert_eq!(service.validations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejections_never_reach_the_loader() {
        let dir = tempdir().unwrap();
        let cases = [
            ("swagger.json", r#"{"swagger": "2.0"}"#, ErrorKind::Semantic),
            ("empty.yaml", "{}", ErrorKind::Semantic),
            ("both.yml", "swagger: '2.0'\nopenapi: 3.0.0\n", ErrorKind::Semantic),
            ("spec.txt", "{not even json", ErrorKind::Format),
            ("broken.json", r#"{"openapi": "#, ErrorKind::Decode),
        ];
        for (name, content, kind) in cases {
            let path = write(&dir, name, content);
            let service = CountingService::default();
            let err = Preflight::with_service(config_for(&dir), service.clone())
                .check(&path)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), kind, "{name}: {err}");
            assert_eq!(service.loads.load(Ordering::SeqCst), 0, "{name}");
        }
    }

    #[tokio::test]
    async fn test_swagger_message() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "spec.json", r#"{"swagger": "2.0"}"#);
        let err = Preflight::new(config_for(&dir)).check(&path).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported Swagger/OpenAPI 2.0"));
    }

    #[tokio::test]
    async fn test_missing_root_and_document() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "spec.json", DEMO);

        let config = PreflightConfig {
            root_dir: Some(dir.path().join("missing")),
            ..PreflightConfig::default()
        };
        let err = Preflight::new(config).check(&path).await.unwrap_err();
        assert!(matches!(err, Error::RootNotFound(_)));

        let err = Preflight::new(config_for(&dir))
            .check(dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn test_working_dir_is_restored_on_every_exit_path() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("api/schemas")).unwrap();
        std::fs::write(
            dir.path().join("api/schemas/pet.json"),
            r#"{"Pet": {"type": "object"}}"#,
        )
        .unwrap();
        let good = dir.path().join("api/good.yaml");
        std::fs::write(
            &good,
            "openapi: 3.0.0\ninfo:\n  title: Pets\n  version: '1'\npaths: {}\ncomponents:\n  schemas:\n    Pet:\n      $ref: schemas/pet.json#/Pet\n",
        )
        .unwrap();
        let bad = dir.path().join("api/bad.yaml");
        std::fs::write(
            &bad,
            "openapi: 3.0.0\ninfo:\n  title: Pets\n  version: '1'\npaths: {}\ncomponents:\n  schemas:\n    Pet:\n      $ref: schemas/missing.json#/Pet\n",
        )
        .unwrap();

        let config = PreflightConfig {
            base_strategy: BaseStrategy::WorkingDirectory,
            ..config_for(&dir)
        };
        let preflight = Preflight::new(config);

        let _lock = lock_cwd();
        let before = std::env::current_dir().unwrap();

        let outcome = preflight.check(&good).await.unwrap();
        assert_eq!(
            outcome
                .document
                .as_json()
                .pointer("/components/schemas/Pet/type")
                .and_then(JsonValue::as_str),
            Some("object")
        );
        assert_eq!(std::env::current_dir().unwrap(), before);

        let err = preflight.check(&bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[tokio::test]
    async fn test_summary_report_for_demo() {
        let dir = tempdir().unwrap();
        let path = write(&dir, "spec.json", DEMO);
        let outcome = Preflight::new(config_for(&dir)).check(&path).await.unwrap();

        let mut out = Vec::new();
        outcome.write_report(&mut out, ReportMode::Summary).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "OpenAPI:        3.0.0\nTitle:          Demo\nVersion:        1.0.0\n"
        );

        let mut out = Vec::new();
        outcome.write_report(&mut out, ReportMode::None).unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_ref_scan_follows_config() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("pets.json"),
            r#"{"get": {"responses": {"200": {"description": "ok"}}}}"#,
        )
        .unwrap();
        let path = write(
            &dir,
            "spec.json",
            r#"{"openapi": "3.0.0", "info": {"title": "Demo", "version": "1"},
                "paths": {"/pets": {"$ref": "pets.json"}}}"#,
        );

        let outcome = Preflight::new(config_for(&dir)).check(&path).await.unwrap();
        assert_eq!(outcome.ref_extensions.len(), 1);
        assert_eq!(outcome.ref_extensions[0].path, "/pets");
        assert_eq!(outcome.ref_extensions[0].value, "\"pets.json\"");

        let config = PreflightConfig {
            scan_refs: false,
            ..config_for(&dir)
        };
        let outcome = Preflight::new(config).check(&path).await.unwrap();
        assert!(outcome.ref_extensions.is_empty());
    }
}
