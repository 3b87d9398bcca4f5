//! Request payload validation.
//!
//! Payloads are deserialized from JSON and checked with `validator`;
//! failures become a single `BadRequest` whose `errors` map field paths
//! to messages: `{"title": ["A blog must have a title"]}`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use validator::Validate;

use crate::errors::BlogError;

#[derive(Default, Debug)]
pub struct SchemaErrors {
    map: Map<String, Value>,
    messages: Vec<String>,
}

impl SchemaErrors {
    pub fn push_schema(&mut self, msg: impl Into<String>) {
        self.push_field("_schema", msg);
    }

    pub fn push_field(&mut self, field: &str, msg: impl Into<String>) {
        let msg = msg.into();
        self.messages.push(msg.clone());
        match self.map.get_mut(field) {
            Some(Value::Array(arr)) => arr.push(Value::String(msg)),
            _ => {
                self.map
                    .insert(field.to_string(), Value::Array(vec![Value::String(msg)]));
            }
        }
    }

    pub fn into_anyhow(self) -> anyhow::Error {
        let message = format!("Invalid input data. {}", self.messages.join(". "));
        BlogError::bad_request(message)
            .with_errors(Value::Object(self.map))
            .into_anyhow()
    }
}

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "length" => Some("has invalid length"),
        _ => None,
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn push_validation_errors(out: &mut SchemaErrors, prefix: &str, errs: &validator::ValidationErrors) {
    // Stable output order regardless of the map's iteration order.
    let mut fields: Vec<_> = errs.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        match kind {
            validator::ValidationErrorsKind::Field(field_errors) => {
                let key = join_path(prefix, field);
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| format!("{key} {m}")))
                        .unwrap_or_else(|| e.code.to_string());
                    out.push_field(&key, msg);
                }
            }
            validator::ValidationErrorsKind::Struct(nested) => {
                push_validation_errors(out, &join_path(prefix, field), nested.as_ref());
            }
            validator::ValidationErrorsKind::List(list) => {
                let base = join_path(prefix, field);
                for (idx, nested) in list {
                    push_validation_errors(out, &format!("{base}[{idx}]"), nested.as_ref());
                }
            }
        }
    }
}

/// Deserialize `data` into `T` and run its validators.
pub fn validate<T>(data: &Value) -> anyhow::Result<T>
where
    T: DeserializeOwned + Validate,
{
    let parsed: T = serde_json::from_value(data.clone()).map_err(|e| {
        let mut out = SchemaErrors::default();
        out.push_schema(e.to_string());
        out.into_anyhow()
    })?;

    if let Err(errs) = parsed.validate() {
        let mut out = SchemaErrors::default();
        push_validation_errors(&mut out, "", &errs);
        return Err(out.into_anyhow());
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;
    use validator::Validate;

    use super::validate;
    use crate::errors::{BlogError, ErrorKind};

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 2, message = "name must be at least 2 chars"))]
        name: String,
    }

    #[test]
    fn validator_failures_become_bad_request_with_paths() {
        let err = validate::<Sample>(&json!({"name": "x"})).unwrap_err();
        let blog = BlogError::from_anyhow(&err).expect("must be BlogError");

        assert_eq!(blog.kind, ErrorKind::BadRequest);
        assert_eq!(blog.message, "Invalid input data. name must be at least 2 chars");
        assert_eq!(blog.errors.as_ref().unwrap()["name"][0], "name must be at least 2 chars");
    }

    #[test]
    fn type_mismatch_is_a_schema_error() {
        let err = validate::<Sample>(&json!({"name": 5})).unwrap_err();
        let blog = BlogError::from_anyhow(&err).expect("must be BlogError");
        assert_eq!(blog.kind, ErrorKind::BadRequest);
        assert!(blog.message.starts_with("Invalid input data. "));
        assert_eq!(blog.errors.as_ref().unwrap()["_schema"].as_array().unwrap().len(), 1);
    }
}
