//! Order fixture loading and structural validation.
//!
//! A fixture is the JSON body POSTed to the order API. Only its outline is
//! checked:
//!
//! | Field | Required shape |
//! |-------|----------------|
//! | `correlationId` | scalar |
//! | `order` | object |
//! | `order.code` | scalar |
//! | `stops` | array of objects |
//! | `routes` | array of objects |
//!
//! Scalars are strings, numbers, booleans and `null`. Everything else in the
//! document is passed through untouched.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{ProbeError, ProbeResult, ValidationError};
use crate::ids::RunIdentifiers;

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

/// Checks the fixture outline. Fields are checked in table order and the
/// first problem is reported.
pub fn validate_structure(document: &Value) -> Result<(), ValidationError> {
    let root = document.as_object().ok_or(ValidationError::NotAnObject)?;

    match root.get("correlationId") {
        None => return Err(ValidationError::MissingField { field: "correlationId" }),
        Some(v) if !is_scalar(v) => {
            return Err(ValidationError::WrongType {
                field: "correlationId",
                expected: "a scalar",
            });
        }
        Some(_) => {}
    }

    let order = match root.get("order") {
        None => return Err(ValidationError::MissingField { field: "order" }),
        Some(Value::Object(order)) => order,
        Some(_) => {
            return Err(ValidationError::WrongType {
                field: "order",
                expected: "an object",
            });
        }
    };

    match order.get("code") {
        None => return Err(ValidationError::MissingField { field: "order.code" }),
        Some(v) if !is_scalar(v) => {
            return Err(ValidationError::WrongType {
                field: "order.code",
                expected: "a scalar",
            });
        }
        Some(_) => {}
    }

    let stops = object_array(root.get("stops"), "stops")?;
    let routes = object_array(root.get("routes"), "routes")?;

    check_elements(stops, "stops")?;
    check_elements(routes, "routes")
}

fn object_array<'a>(
    value: Option<&'a Value>,
    field: &'static str,
) -> Result<&'a [Value], ValidationError> {
    match value {
        None => Err(ValidationError::MissingField { field }),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ValidationError::WrongType {
            field,
            expected: "an array",
        }),
    }
}

fn check_elements(items: &[Value], field: &'static str) -> Result<(), ValidationError> {
    match items.iter().position(|item| !item.is_object()) {
        Some(index) => Err(ValidationError::NonObjectElement { field, index }),
        None => Ok(()),
    }
}

/// A validated order fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDocument {
    source: Option<PathBuf>,
    document: Value,
}

impl FixtureDocument {
    /// Reads, parses and validates the fixture at `path`.
    pub async fn load(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProbeError::FixtureIo {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(path, &text)
    }

    /// Parses and validates fixture text read from `path`.
    pub fn parse(path: impl AsRef<Path>, text: &str) -> ProbeResult<Self> {
        let path = path.as_ref();
        let document: Value =
            serde_json::from_str(text).map_err(|source| ProbeError::FixtureParse {
                path: path.to_path_buf(),
                source,
            })?;
        let mut fixture = Self::from_value(document)?;
        fixture.source = Some(path.to_path_buf());
        Ok(fixture)
    }

    /// Validates an in-memory document.
    pub fn from_value(document: Value) -> Result<Self, ValidationError> {
        validate_structure(&document)?;
        Ok(Self {
            source: None,
            document,
        })
    }

    /// Overwrites `correlationId` and `order.code` with the run's identifiers.
    pub fn assign_identifiers(&mut self, ids: &RunIdentifiers) {
        // Shape was checked on construction.
        if let Some(root) = self.document.as_object_mut() {
            root.insert(
                "correlationId".to_string(),
                Value::String(ids.correlation_id.clone()),
            );
            if let Some(order) = root.get_mut("order").and_then(Value::as_object_mut) {
                order.insert("code".to_string(), Value::String(ids.order_code.clone()));
            }
        }
    }

    /// File the fixture was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// `correlationId`, when it is a string.
    pub fn correlation_id(&self) -> Option<&str> {
        self.document.get("correlationId").and_then(Value::as_str)
    }

    /// `order.code`, when it is a string.
    pub fn order_code(&self) -> Option<&str> {
        self.document
            .get("order")
            .and_then(|order| order.get("code"))
            .and_then(Value::as_str)
    }

    /// Number of stops.
    pub fn stop_count(&self) -> usize {
        self.document
            .get("stops")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Number of routes.
    pub fn route_count(&self) -> usize {
        self.document
            .get("routes")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// The document.
    pub fn as_value(&self) -> &Value {
        &self.document
    }

    /// Compact JSON request body.
    pub fn to_body(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string(&self.document)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "correlationId": "ORIGINAL",
            "order": {"code": "OLD", "customer": "ACME"},
            "stops": [{"sequence": 1}, {"sequence": 2}],
            "routes": [{"name": "main"}]
        })
    }

    fn without(field: &str) -> Value {
        let mut doc = sample();
        doc.as_object_mut().unwrap().remove(field);
        doc
    }

    #[test]
    fn test_valid_fixture_passes() {
        assert!(validate_structure(&sample()).is_ok());
    }

    #[test]
    fn test_root_must_be_object() {
        assert_eq!(
            validate_structure(&json!([1, 2])),
            Err(ValidationError::NotAnObject)
        );
    }

    #[test]
    fn test_each_required_field_is_checked() {
        for field in ["correlationId", "order", "stops", "routes"] {
            assert_eq!(
                validate_structure(&without(field)),
                Err(ValidationError::MissingField { field }),
                "removing {field}"
            );
        }
    }

    #[test]
    fn test_missing_order_code() {
        let mut doc = sample();
        doc["order"].as_object_mut().unwrap().remove("code");
        assert_eq!(
            validate_structure(&doc),
            Err(ValidationError::MissingField { field: "order.code" })
        );
    }

    #[test]
    fn test_scalars_include_null_and_numbers() {
        let mut doc = sample();
        doc["correlationId"] = Value::Null;
        doc["order"]["code"] = json!(42);
        assert!(validate_structure(&doc).is_ok());
    }

    #[test]
    fn test_container_in_scalar_field_is_rejected() {
        let mut doc = sample();
        doc["correlationId"] = json!({"nested": true});
        assert_eq!(
            validate_structure(&doc),
            Err(ValidationError::WrongType {
                field: "correlationId",
                expected: "a scalar"
            })
        );

        let mut doc = sample();
        doc["order"]["code"] = json!(["A"]);
        assert!(matches!(
            validate_structure(&doc),
            Err(ValidationError::WrongType { field: "order.code", .. })
        ));
    }

    #[test]
    fn test_order_must_be_object() {
        let mut doc = sample();
        doc["order"] = json!("ABC");
        assert!(matches!(
            validate_structure(&doc),
            Err(ValidationError::WrongType { field: "order", .. })
        ));
    }

    #[test]
    fn test_stops_and_routes_must_be_arrays() {
        let mut doc = sample();
        doc["stops"] = json!({"sequence": 1});
        assert!(matches!(
            validate_structure(&doc),
            Err(ValidationError::WrongType { field: "stops", .. })
        ));
    }

    #[test]
    fn test_non_object_elements_are_rejected() {
        let mut doc = sample();
        doc["stops"] = json!([{"sequence": 1}, "two"]);
        assert_eq!(
            validate_structure(&doc),
            Err(ValidationError::NonObjectElement {
                field: "stops",
                index: 1
            })
        );

        let mut doc = sample();
        doc["routes"] = json!([null]);
        assert_eq!(
            validate_structure(&doc),
            Err(ValidationError::NonObjectElement {
                field: "routes",
                index: 0
            })
        );
    }

    #[test]
    fn test_empty_arrays_are_valid() {
        let mut doc = sample();
        doc["stops"] = json!([]);
        doc["routes"] = json!([]);
        assert!(validate_structure(&doc).is_ok());
    }

    #[test]
    fn test_assign_identifiers_overwrites_both_fields() {
        let mut fixture = FixtureDocument::from_value(sample()).unwrap();
        let ids = RunIdentifiers {
            correlation_id: "CORR000000000001".to_string(),
            order_code: "ORDER000000000001".to_string(),
        };
        fixture.assign_identifiers(&ids);

        assert_eq!(fixture.correlation_id(), Some("CORR000000000001"));
        assert_eq!(fixture.order_code(), Some("ORDER000000000001"));
        assert_eq!(fixture.as_value()["order"]["customer"], "ACME");
        assert_eq!(fixture.stop_count(), 2);
        assert_eq!(fixture.route_count(), 1);
    }

    #[test]
    fn test_body_is_compact() {
        let fixture = FixtureDocument::from_value(sample()).unwrap();
        let body = fixture.to_body().unwrap();
        assert!(!body.contains('\n'));
        assert!(!body.contains(": "));
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), sample());
    }

    #[test]
    fn test_parse_reports_invalid_json() {
        let err = FixtureDocument::parse("Postman.json", "{not json").unwrap_err();
        assert!(matches!(err, ProbeError::FixtureParse { .. }));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = FixtureDocument::load("/definitely/not/here.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::FixtureIo { .. }));
    }

    #[tokio::test]
    async fn test_load_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Postman.json");
        std::fs::write(&path, sample().to_string()).unwrap();

        let fixture = FixtureDocument::load(&path).await.unwrap();
        assert_eq!(fixture.source(), Some(path.as_path()));
    }
}
