//! Structural and semantic checks on a loaded document.
//!
//! All checks run and every problem found is reported together.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use super::refs::decode_fragment;
use super::LoadedDocument;
use crate::Error;

/// HTTP methods recognized on a path item.
const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

static COMPONENT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.\-_]+$").expect("component key pattern"));

static PATH_TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}/]+)\}").expect("path template pattern"));

/// Validate `document`, returning every issue found as one [`Error::Validation`].
pub fn validate_document(document: &LoadedDocument) -> crate::Result<()> {
    let mut issues = Vec::new();
    let root = document.as_json();

    check_header(document, &mut issues);
    check_paths(root, &mut issues);
    check_operations(document, &mut issues);
    check_components(root, &mut issues);
    check_local_refs(root, root, &mut String::new(), &mut issues);

    if issues.is_empty() {
        log::debug!("Document '{}' is valid", document.title());
        Ok(())
    } else {
        Err(Error::Validation { issues })
    }
}

fn check_header(document: &LoadedDocument, issues: &mut Vec<String>) {
    if !document.openapi_version().starts_with("3.") {
        issues.push(format!(
            "unsupported OpenAPI version '{}' (expected 3.x)",
            document.openapi_version()
        ));
    }
    if document.title().trim().is_empty() {
        issues.push("info.title must not be empty".to_string());
    }
    if document.version().trim().is_empty() {
        issues.push("info.version must not be empty".to_string());
    }
}

#[derive(Debug)]
struct Param<'a> {
    name: &'a str,
    location: &'a str,
    required: bool,
}

fn check_paths(root: &JsonValue, issues: &mut Vec<String>) {
    let Some(paths) = root.get("paths").and_then(JsonValue::as_object) else {
        return;
    };

    for (path, item) in paths {
        if path.starts_with("x-") {
            continue;
        }
        if !path.starts_with('/') {
            issues.push(format!("path '{path}' must begin with '/'"));
            continue;
        }
        let Some(item) = item.as_object() else {
            issues.push(format!("path item for '{path}' must be an object"));
            continue;
        };
        if item.contains_key("$ref") {
            continue;
        }

        let template: Vec<&str> = PATH_TEMPLATE
            .captures_iter(path)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        let shared = parameters(root, item);
        let scope = format!("path '{path}'");
        check_parameters(&shared, &template, &scope, issues);

        let mut has_operation = false;
        for method in HTTP_METHODS {
            let Some(operation) = item.get(*method).and_then(JsonValue::as_object) else {
                continue;
            };
            has_operation = true;
            let own = parameters(root, operation);
            let scope = format!("{} {}", method.to_uppercase(), path);
            check_parameters(&own, &template, &scope, issues);
            check_template_declared(&template, shared.iter().chain(own.iter()), &scope, issues);
        }
        if !has_operation {
            check_template_declared(&template, shared.iter(), &scope, issues);
        }
    }
}

/// Parameters declared on a path item or operation, with local refs followed.
fn parameters<'a>(root: &'a JsonValue, owner: &'a Map<String, JsonValue>) -> Vec<Param<'a>> {
    let Some(items) = owner.get("parameters").and_then(JsonValue::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item.get("$ref").and_then(JsonValue::as_str) {
            Some(reference) => reference
                .strip_prefix('#')
                .and_then(|fragment| root.pointer(&decode_fragment(fragment))),
            None => Some(item),
        })
        .filter_map(|param| {
            Some(Param {
                name: param.get("name")?.as_str()?,
                location: param.get("in")?.as_str()?,
                required: param
                    .get("required")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false),
            })
        })
        .collect()
}

fn check_parameters(
    params: &[Param<'_>],
    template: &[&str],
    scope: &str,
    issues: &mut Vec<String>,
) {
    let mut seen = HashSet::new();
    for param in params {
        if !seen.insert((param.name, param.location)) {
            issues.push(format!(
                "{scope}: parameter '{}' in {} is declared more than once",
                param.name, param.location
            ));
        }
        if param.location != "path" {
            continue;
        }
        if !param.required {
            issues.push(format!(
                "{scope}: path parameter '{}' must be required",
                param.name
            ));
        }
        if !template.contains(&param.name) {
            issues.push(format!(
                "{scope}: path parameter '{}' does not appear in the path",
                param.name
            ));
        }
    }
}

fn check_template_declared<'p, 'a: 'p>(
    template: &[&str],
    params: impl Iterator<Item = &'p Param<'a>>,
    scope: &str,
    issues: &mut Vec<String>,
) {
    let declared: HashSet<&str> = params
        .filter(|param| param.location == "path")
        .map(|param| param.name)
        .collect();
    for name in template {
        if !declared.contains(name) {
            issues.push(format!("{scope}: path parameter '{name}' is not declared"));
        }
    }
}

fn check_operations(document: &LoadedDocument, issues: &mut Vec<String>) {
    let mut ids: HashMap<&str, String> = HashMap::new();
    for (path, method, operation) in document.spec().operations() {
        let scope = format!("{} {}", method.to_uppercase(), path);
        if operation.responses.default.is_none() && operation.responses.responses.is_empty() {
            issues.push(format!("{scope}: no responses declared"));
        }
        if let Some(id) = operation.operation_id.as_deref() {
            if let Some(first) = ids.get(id) {
                issues.push(format!(
                    "operationId '{id}' is used by both {first} and {scope}"
                ));
            } else {
                ids.insert(id, scope);
            }
        }
    }
}

fn check_components(root: &JsonValue, issues: &mut Vec<String>) {
    let Some(components) = root.get("components").and_then(JsonValue::as_object) else {
        return;
    };
    for (section, entries) in components {
        if section.starts_with("x-") {
            continue;
        }
        let Some(entries) = entries.as_object() else {
            continue;
        };
        for key in entries.keys() {
            if !COMPONENT_KEY.is_match(key) {
                issues.push(format!(
                    "components.{section} key '{key}' must match {}",
                    COMPONENT_KEY.as_str()
                ));
            }
        }
    }
}

/// Report local `$ref`s that do not point anywhere in the document.
fn check_local_refs(
    node: &JsonValue,
    root: &JsonValue,
    location: &mut String,
    issues: &mut Vec<String>,
) {
    match node {
        JsonValue::Object(obj) => {
            if let Some(reference) = obj.get("$ref").and_then(JsonValue::as_str) {
                if let Some(fragment) = reference.strip_prefix('#') {
                    if root.pointer(&decode_fragment(fragment)).is_none() {
                        issues.push(format!(
                            "unresolved $ref '{reference}' at #{location}"
                        ));
                    }
                }
                return;
            }
            for (key, value) in obj {
                let len = location.len();
                location.push('/');
                location.push_str(&key.replace('~', "~0").replace('/', "~1"));
                check_local_refs(value, root, location, issues);
                location.truncate(len);
            }
        }
        JsonValue::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                let len = location.len();
                location.push_str(&format!("/{index}"));
                check_local_refs(value, root, location, issues);
                location.truncate(len);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openapiv3::OpenAPI;
    use serde_json::json;

    fn document(json: JsonValue) -> LoadedDocument {
        let spec: OpenAPI = serde_json::from_value(json.clone()).unwrap();
        LoadedDocument::new(spec, json.clone(), json)
    }

    fn issues(json: JsonValue) -> Vec<String> {
        match validate_document(&document(json)) {
            Ok(()) => Vec::new(),
            Err(Error::Validation { issues }) => issues,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    fn petstore() -> JsonValue {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "Petstore", "version": "1.0.0"},
            "paths": {
                "/pets/{petId}": {
                    "parameters": [{"$ref": "#/components/parameters/PetId"}],
                    "get": {
                        "operationId": "getPet",
                        "responses": {"200": {"description": "ok"}}
                    },
                    "delete": {
                        "operationId": "deletePet",
                        "responses": {"default": {"description": "error"}}
                    }
                }
            },
            "components": {
                "parameters": {
                    "PetId": {"name": "petId", "in": "path", "required": true, "schema": {"type": "string"}}
                }
            }
        })
    }

    #[test]
    fn test_valid_document() {
        assert_eq!(issues(petstore()), Vec::<String>::new());
    }

    #[test]
    fn test_empty_title_and_version() {
        let mut doc = petstore();
        doc["info"] = json!({"title": "", "version": " "});
        let found = issues(doc);
        assert!(found.contains(&"info.title must not be empty".to_string()));
        assert!(found.contains(&"info.version must not be empty".to_string()));
    }

    #[test]
    fn test_duplicate_operation_id() {
        let mut doc = petstore();
        doc["paths"]["/pets/{petId}"]["delete"]["operationId"] = json!("getPet");
        let found = issues(doc);
        assert_eq!(
            found,
            vec!["operationId 'getPet' is used by both GET /pets/{petId} and DELETE /pets/{petId}".to_string()]
        );
    }

    #[test]
    fn test_undeclared_path_parameter() {
        let mut doc = petstore();
        doc["paths"]["/pets/{petId}"]["parameters"] = json!([]);
        let found = issues(doc);
        assert!(found.contains(&"GET /pets/{petId}: path parameter 'petId' is not declared".to_string()));
        assert!(found.contains(&"DELETE /pets/{petId}: path parameter 'petId' is not declared".to_string()));
    }

    #[test]
    fn test_optional_path_parameter_not_in_template() {
        let mut doc = petstore();
        doc["paths"]["/pets/{petId}"]["get"]["parameters"] =
            json!([{"name": "owner", "in": "path", "schema": {"type": "string"}}]);
        let found = issues(doc);
        assert!(found.contains(&"GET /pets/{petId}: path parameter 'owner' must be required".to_string()));
        assert!(found.contains(&"GET /pets/{petId}: path parameter 'owner' does not appear in the path".to_string()));
    }

    #[test]
    fn test_operation_without_responses() {
        let mut doc = petstore();
        doc["paths"]["/pets/{petId}"]["get"]["responses"] = json!({});
        assert_eq!(
            issues(doc),
            vec!["GET /pets/{petId}: no responses declared".to_string()]
        );
    }

    #[test]
    fn test_bad_component_key_and_dangling_ref() {
        let mut doc = petstore();
        doc["components"]["schemas"] = json!({
            "Bad Name": {"type": "string"},
            "Owner": {"$ref": "#/components/schemas/Missing"}
        });
        let found = issues(doc);
        assert!(found.iter().any(|i| i.starts_with("components.schemas key 'Bad Name'")));
        assert!(found.contains(
            &"unresolved $ref '#/components/schemas/Missing' at #/components/schemas/Owner".to_string()
        ));
    }

    #[test]
    fn test_percent_encoded_local_refs_resolve() {
        let mut doc = petstore();
        doc["paths"]["/pets/{petId}"]["parameters"] =
            json!([{"$ref": "#/components/parameters/Pet%49d"}]);
        doc["components"]["schemas"] = json!({
            "Owner": {"$ref": "#/components/parameters/Pet%49d/schema"}
        });
        assert_eq!(issues(doc), Vec::<String>::new());
    }

    #[test]
    fn test_unsupported_version() {
        let mut doc = petstore();
        doc["openapi"] = json!("2.0");
        assert_eq!(
            issues(doc),
            vec!["unsupported OpenAPI version '2.0' (expected 3.x)".to_string()]
        );
    }
}
