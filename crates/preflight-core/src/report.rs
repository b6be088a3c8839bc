//! Reporting of loaded documents.

use std::io::{self, Write};

use serde_json::Value as JsonValue;

use crate::openapi::LoadedDocument;

/// Width of the label column in the summary
const LABEL_WIDTH: usize = 15;

/// Write one label/value pair per line for the `info` object.
///
/// Optional fields are skipped when absent or empty.
pub fn write_summary<W: Write>(out: &mut W, document: &LoadedDocument) -> io::Result<()> {
    let info = &document.spec().info;

    line(out, "OpenAPI:", document.openapi_version())?;
    line(out, "Title:", &info.title)?;
    optional(out, "Description:", info.description.as_deref())?;
    optional(out, "TermsOfService:", info.terms_of_service.as_deref())?;
    if let Some(contact) = &info.contact {
        optional(out, "Contact->Name:", contact.name.as_deref())?;
        optional(out, "Contact->Email:", contact.email.as_deref())?;
        optional(out, "Contact->URL:", contact.url.as_deref())?;
    }
    if let Some(license) = &info.license {
        optional(out, "License->Name:", Some(license.name.as_str()))?;
        optional(out, "License->URL:", license.url.as_deref())?;
    }
    line(out, "Version:", &info.version)
}

/// Write the resolved document as pretty-printed JSON.
pub fn write_raw<W: Write>(out: &mut W, document: &LoadedDocument) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, document.as_json())?;
    writeln!(out)
}

fn line<W: Write>(out: &mut W, label: &str, value: &str) -> io::Result<()> {
    writeln!(out, "{:<width$} {}", label, value, width = LABEL_WIDTH)
}

fn optional<W: Write>(out: &mut W, label: &str, value: Option<&str>) -> io::Result<()> {
    match value {
        Some(value) if !value.is_empty() => line(out, label, value),
        _ => Ok(()),
    }
}

/// A `$ref` key found directly on a path item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefExtension {
    /// The path the item is registered under
    pub path: String,
    /// The key, always `$ref`
    pub key: String,
    /// The value re-serialized as compact JSON
    pub value: String,
}

/// Find path items carrying a `$ref` key, as the document was written.
pub fn ref_extensions(document: &LoadedDocument) -> Vec<RefExtension> {
    let Some(paths) = document.source().get("paths").and_then(JsonValue::as_object) else {
        return Vec::new();
    };
    paths
        .iter()
        .filter_map(|(path, item)| item.as_object().map(|item| (path, item)))
        .flat_map(|(path, item)| {
            item.iter()
                .filter(|(key, _)| key.as_str() == "$ref")
                .map(move |(key, value)| RefExtension {
                    path: path.clone(),
                    key: key.clone(),
                    value: value.to_string(),
                })
        })
        .collect()
}
