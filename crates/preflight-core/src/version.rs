//! Version discriminator sniffing.
//!
//! Before a document is handed to the document service, only its top-level
//! `swagger` and `openapi` fields are looked at. Everything else in the
//! document is ignored at this stage, so a document whose body is broken still
//! gets a precise answer about its declared version as long as the syntax is
//! valid. A `null` document counts as one with neither field set.
//!
//! # Examples
//!
//! ```
//! use preflight_core::{format::DocumentFormat, version::sniff};
//!
//! let version = sniff(br#"{"openapi": "3.0.3"}"#, DocumentFormat::Json, "spec.json").unwrap();
//! assert_eq!(version.openapi_version(), "3.0.3");
//! ```

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::format::DocumentFormat;
use crate::Error;

/// The two top-level fields that identify the specification family
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VersionDiscriminator {
    /// Swagger 2.0 marker
    #[serde(default, deserialize_with = "scalar_as_written")]
    pub swagger: Option<String>,

    /// OpenAPI 3.x marker
    #[serde(default, deserialize_with = "scalar_as_written")]
    pub openapi: Option<String>,
}

impl VersionDiscriminator {
    /// Apply the acceptance policy: exactly one field set, and it must be `openapi`.
    pub fn check(&self) -> crate::Result<()> {
        match (non_empty(&self.swagger), non_empty(&self.openapi)) {
            (None, None) => Err(Error::invalid_data(
                "neither 'swagger' nor 'openapi' is set",
            )),
            (Some(_), Some(_)) => Err(Error::invalid_data(
                "both 'swagger' and 'openapi' are set",
            )),
            (Some(swagger), None) => Err(Error::UnsupportedSwagger(swagger.to_string())),
            (None, Some(_)) => Ok(()),
        }
    }

    /// The declared OpenAPI version, empty when not set
    pub fn openapi_version(&self) -> &str {
        self.openapi.as_deref().unwrap_or_default()
    }

    /// Pick the fields out of a decoded JSON document.
    ///
    /// Repeated keys have already collapsed to the last occurrence.
    fn from_json(value: JsonValue) -> Result<Self, serde_json::Error> {
        let mut fields = match value {
            JsonValue::Null => return Ok(Self::default()),
            JsonValue::Object(fields) => fields,
            other => {
                return Err(de::Error::custom(format!(
                    "expected an object at the top level, found {}",
                    describe(&other)
                )))
            }
        };
        Ok(Self {
            swagger: json_scalar(fields.remove("swagger"))?,
            openapi: json_scalar(fields.remove("openapi"))?,
        })
    }
}

/// Decode the version discriminator of `data` and check it.
///
/// Decode errors are propagated as they come from the underlying parser.
pub fn sniff(
    data: &[u8],
    format: DocumentFormat,
    location: &str,
) -> crate::Result<VersionDiscriminator> {
    let discriminator = match format {
        DocumentFormat::Json => {
            let value: JsonValue = format.decode(data, location)?;
            VersionDiscriminator::from_json(value).map_err(|source| Error::Json {
                location: location.to_string(),
                source,
            })?
        }
        DocumentFormat::Yaml => format
            .decode::<Option<VersionDiscriminator>>(data, location)?
            .unwrap_or_default(),
    };
    log::debug!(
        "Sniffed {}: swagger={:?} openapi={:?}",
        location,
        discriminator.swagger,
        discriminator.openapi
    );
    discriminator.check()?;
    Ok(discriminator)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn describe(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "a sequence",
        JsonValue::Object(_) => "a mapping",
    }
}

fn json_scalar(value: Option<JsonValue>) -> Result<Option<String>, serde_json::Error> {
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(JsonValue::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a scalar version, found {}",
            describe(&other)
        ))),
    }
}

/// Keep a YAML scalar's source text, so `swagger: 2.10` reads as "2.10".
fn scalar_as_written<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_option(ScalarText)
}

struct ScalarText;

impl<'de> Visitor<'de> for ScalarText {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar version")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        // YAML hands any plain scalar to a string request unchanged
        deserializer.deserialize_str(self)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }
}
