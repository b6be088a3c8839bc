//! External `$ref` resolution.
//!
//! References whose value names another document (`pets.yaml#/Pet`,
//! `https://example.com/common.json`) are fetched relative to the document
//! that contains them and inlined in place. Local references (`#/...`) in the
//! root document are left alone; local references inside a fetched document
//! point into that document and are inlined too. A reference that leads back
//! to itself fails the load.
//!
//! Resolution runs in two passes: every reachable document is fetched first,
//! then the tree is rebuilt synchronously from the fetched set.

use std::borrow::Cow;
use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use serde_json::{Map, Value as JsonValue};
use tokio::fs;
use url::Url;

use crate::format::DocumentFormat;
use crate::Error;

/// A reference split into the document it names and the pointer inside it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    document: Url,
    fragment: String,
}

impl Target {
    fn key(&self) -> String {
        format!("{}#{}", self.document, self.fragment)
    }
}

pub(crate) struct RefResolver<'a> {
    client: &'a reqwest::Client,
    root: Url,
    documents: HashMap<Url, JsonValue>,
}

impl<'a> RefResolver<'a> {
    /// `root` is the location of `document`; any fragment on it is dropped.
    pub(crate) fn new(client: &'a reqwest::Client, mut root: Url, document: JsonValue) -> Self {
        root.set_fragment(None);
        let mut documents = HashMap::new();
        documents.insert(root.clone(), document);
        Self {
            client,
            root,
            documents,
        }
    }

    /// Fetch every document reachable from the root through external refs.
    pub(crate) async fn fetch_all(&mut self) -> crate::Result<()> {
        let mut pending = vec![self.root.clone()];
        while let Some(location) = pending.pop() {
            let mut targets = Vec::new();
            if let Some(document) = self.documents.get(&location) {
                collect_external(document, &location, &mut targets)?;
            }
            for target in targets {
                if self.documents.contains_key(&target) {
                    continue;
                }
                let document = fetch(self.client, &target).await?;
                self.documents.insert(target.clone(), document);
                pending.push(target);
            }
        }
        log::debug!(
            "Fetched {} referenced document(s)",
            self.documents.len().saturating_sub(1)
        );
        Ok(())
    }

    /// Rebuild the root document with every external reference inlined.
    pub(crate) fn resolve(&self) -> crate::Result<JsonValue> {
        let root = self
            .documents
            .get(&self.root)
            .ok_or_else(|| Error::reference(self.root.as_str(), "root document missing"))?;
        let mut stack = Vec::new();
        self.inline(root, &self.root, &mut stack)
    }

    fn inline(
        &self,
        value: &JsonValue,
        location: &Url,
        stack: &mut Vec<String>,
    ) -> crate::Result<JsonValue> {
        match value {
            JsonValue::Object(obj) => {
                if let Some(reference) = obj.get("$ref").and_then(JsonValue::as_str) {
                    return match self.target_of(reference, location)? {
                        Some(target) => self.inline_target(&target, stack),
                        None => Ok(value.clone()),
                    };
                }
                let mut out = Map::with_capacity(obj.len());
                for (key, val) in obj {
                    out.insert(key.clone(), self.inline(val, location, stack)?);
                }
                Ok(JsonValue::Object(out))
            }
            JsonValue::Array(items) => items
                .iter()
                .map(|item| self.inline(item, location, stack))
                .collect::<crate::Result<Vec<_>>>()
                .map(JsonValue::Array),
            other => Ok(other.clone()),
        }
    }

    fn inline_target(&self, target: &Target, stack: &mut Vec<String>) -> crate::Result<JsonValue> {
        let key = target.key();
        if stack.contains(&key) {
            return Err(Error::reference(&key, "reference cycle"));
        }

        let document = self
            .documents
            .get(&target.document)
            .ok_or_else(|| Error::reference(&key, "document was not loaded"))?;
        let node = pointer(document, &target.fragment)
            .ok_or_else(|| Error::reference(&key, "no such location in document"))?;

        stack.push(key);
        let resolved = self.inline(node, &target.document, stack);
        stack.pop();
        resolved
    }

    /// `None` for local references of the root document, which stay as written.
    fn target_of(&self, reference: &str, location: &Url) -> crate::Result<Option<Target>> {
        let (document, fragment) = split_reference(reference);
        if document.is_empty() {
            if *location == self.root {
                return Ok(None);
            }
            return Ok(Some(Target {
                document: location.clone(),
                fragment: fragment.to_string(),
            }));
        }
        Ok(Some(Target {
            document: join(location, document, reference)?,
            fragment: fragment.to_string(),
        }))
    }
}

fn split_reference(reference: &str) -> (&str, &str) {
    reference.split_once('#').unwrap_or((reference, ""))
}

fn join(location: &Url, document: &str, reference: &str) -> crate::Result<Url> {
    let mut url = location
        .join(document)
        .map_err(|e| Error::reference(reference, e.to_string()))?;
    url.set_fragment(None);
    Ok(url)
}

fn pointer<'v>(document: &'v JsonValue, fragment: &str) -> Option<&'v JsonValue> {
    if fragment.is_empty() {
        Some(document)
    } else {
        document.pointer(&decode_fragment(fragment))
    }
}

/// Undo URI percent-encoding so the fragment can be used as a JSON pointer.
pub(crate) fn decode_fragment(fragment: &str) -> Cow<'_, str> {
    percent_decode_str(fragment)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(fragment))
}

/// Collect the documents named by external references under `value`.
fn collect_external(value: &JsonValue, location: &Url, out: &mut Vec<Url>) -> crate::Result<()> {
    match value {
        JsonValue::Object(obj) => {
            if let Some(reference) = obj.get("$ref").and_then(JsonValue::as_str) {
                let (document, _) = split_reference(reference);
                if !document.is_empty() {
                    let url = join(location, document, reference)?;
                    if !out.contains(&url) {
                        out.push(url);
                    }
                }
                return Ok(());
            }
            for val in obj.values() {
                collect_external(val, location, out)?;
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                collect_external(item, location, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

async fn fetch(client: &reqwest::Client, url: &Url) -> crate::Result<JsonValue> {
    let data = match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| Error::reference(url.as_str(), "not a local file path"))?;
            fs::read(&path)
                .await
                .map_err(|e| Error::io(path.display().to_string(), e))?
        }
        "http" | "https" => {
            let fetch_error = |reason: String| Error::Fetch {
                location: url.to_string(),
                reason,
            };
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| fetch_error(e.to_string()))?;
            if !response.status().is_success() {
                return Err(fetch_error(format!("HTTP {}", response.status())));
            }
            response
                .bytes()
                .await
                .map_err(|e| fetch_error(e.to_string()))?
                .to_vec()
        }
        other => {
            return Err(Error::reference(
                url.as_str(),
                format!("unsupported scheme '{other}'"),
            ))
        }
    };
    log::debug!("Loaded referenced document {}", url);
    decode_any(&data, url)
}

/// Decode by extension, or try JSON first and then YAML when the name does not tell.
fn decode_any(data: &[u8], url: &Url) -> crate::Result<JsonValue> {
    match DocumentFormat::from_url_path(url.path()) {
        Some(format) => format.decode(data, url.as_str()),
        None => serde_json::from_slice(data)
            .or_else(|_| DocumentFormat::Yaml.decode(data, url.as_str())),
    }
}
