//! Preflight Core Library
//!
//! This library checks OpenAPI documents before anything else touches them:
//! it picks the serialization format from the file extension, sniffs the
//! `swagger`/`openapi` discriminator, loads the document with the right base
//! location for external references, optionally validates it, and reports
//! what it found.

pub mod config;
pub mod error;
pub mod format;
pub mod location;
pub mod openapi;
pub mod preflight;
pub mod report;
pub mod version;

pub use crate::{
    config::{PreflightConfig, ReportMode},
    error::{Error, ErrorKind, Result},
    format::DocumentFormat,
    location::{BaseLocation, BaseStrategy, DocumentReference},
    openapi::{DocumentService, LoadedDocument, OpenApiV3Service},
    preflight::{CheckOutcome, Preflight},
};
