//! Request validation.
//!
//! Untyped input (a JSON body or a query string) is checked against a
//! declarative [`Schema`] and, when it passes, deserialized into the typed
//! request struct. Two failure modes are kept apart:
//!
//! - [`ValidationError::Malformed`]: the payload could not be parsed at all
//! - [`ValidationError::Invalid`]: it parsed, but violated the schema
//!
//! Handlers normally go through the [`ValidatedJson`] / [`ValidatedQuery`]
//! extractors instead of calling [`validate`] directly.

mod extract;
mod schema;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

pub use extract::{Validate, ValidatedJson, ValidatedQuery};
pub use schema::{FieldKind, FieldSpec, Relation, Rule, Schema, is_valid_email};

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field path, e.g. `email`
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("{} field(s) failed validation", .0.len())]
    Invalid(Vec<FieldError>),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Raw, not yet validated request input.
#[derive(Debug, Clone, Copy)]
pub enum RawInput<'a> {
    /// A JSON request body
    Json(&'a [u8]),
    /// A URL query string, without the leading `?`
    Query(&'a str),
}

impl RawInput<'_> {
    fn into_object(self) -> ValidationResult<Map<String, Value>> {
        match self {
            RawInput::Json(bytes) => parse_json_object(bytes),
            RawInput::Query(query) => Ok(parse_query(query)),
        }
    }
}

/// Validate raw input against `schema` and deserialize it into `T`.
pub fn validate<T: DeserializeOwned>(input: RawInput<'_>, schema: &Schema) -> ValidationResult<T> {
    let object = input.into_object()?;
    let normalized = schema.check(&object).map_err(ValidationError::Invalid)?;

    serde_json::from_value(Value::Object(normalized))
        .map_err(|e| ValidationError::Malformed(sanitize_serde_error(&e)))
}

fn parse_json_object(bytes: &[u8]) -> ValidationResult<Map<String, Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::Malformed(
            "Request body is empty".to_string(),
        ));
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::Malformed(
            "Request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(ValidationError::Malformed(sanitize_serde_error(&e))),
    }
}

/// Parse a query string into a JSON object.
///
/// Repeated keys are collected into an array in the order they appear.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let mut map = Map::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match map.get_mut(&*key) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                map.insert(key.into_owned(), value);
            }
        }
    }

    map
}

/// Sanitize serde error messages to avoid leaking internal type information.
fn sanitize_serde_error(e: &serde_json::Error) -> String {
    use serde_json::error::Category;

    match e.classify() {
        Category::Eof => "Unexpected end of JSON in request body".to_string(),
        Category::Syntax => "Malformed JSON in request body".to_string(),
        Category::Data => "Invalid data type in request".to_string(),
        Category::Io => "Invalid request format".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Listing {
        page: u32,
        limit: u32,
        #[serde(default)]
        tags: Vec<String>,
    }

    fn listing_schema() -> Schema {
        Schema::new()
            .field(FieldSpec::integer("page").default_value(1).min(1))
            .field(FieldSpec::integer("limit").default_value(10).min(1).max(100))
            .field(FieldSpec::string_list("tags"))
    }

    #[test]
    fn test_query_repeated_keys_become_sequence() {
        let map = parse_query("tags=rust&page=2&tags=cloud&tags=ai");

        assert_eq!(map["tags"], json!(["rust", "cloud", "ai"]));
        assert_eq!(map["page"], json!("2"));
    }

    #[test]
    fn test_query_percent_decoding() {
        let map = parse_query("search=cloud%20migration&q=a+b");

        assert_eq!(map["search"], json!("cloud migration"));
        assert_eq!(map["q"], json!("a b"));
    }

    #[test]
    fn test_validate_query_coerces_and_defaults() {
        let listing: Listing = validate(RawInput::Query("limit=5&tags=rust"), &listing_schema()).unwrap();

        assert_eq!(listing.page, 1);
        assert_eq!(listing.limit, 5);
        assert_eq!(listing.tags, vec!["rust".to_string()]);
    }

    #[test]
    fn test_validate_reports_invalid_fields() {
        let err = validate::<Listing>(RawInput::Query("page=0&limit=1000"), &listing_schema())
            .unwrap_err();

        let ValidationError::Invalid(errors) = err else {
            panic!("expected field errors");
        };
        let paths: Vec<_> = errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["page", "limit"]);
    }

    #[test]
    fn test_invalid_json_is_malformed_not_invalid() {
        let err = validate::<Listing>(RawInput::Json(b"{\"page\": "), &listing_schema()).unwrap_err();

        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        let err = validate::<Listing>(RawInput::Json(b"  "), &listing_schema()).unwrap_err();

        assert_eq!(
            err,
            ValidationError::Malformed("Request body is empty".to_string())
        );
    }

    #[test]
    fn test_non_object_body_is_malformed() {
        let err = validate::<Listing>(RawInput::Json(b"[1, 2]"), &listing_schema()).unwrap_err();

        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_valid_json_body() {
        let listing: Listing = validate(RawInput::Json(br#"{"page": 2, "limit": "20"}"#), &listing_schema())
            .unwrap();

        assert_eq!(listing.page, 2);
        assert_eq!(listing.limit, 20);
        assert!(listing.tags.is_empty());
    }
}
