//! Structural decoding of untyped JSON into typed commands.
//!
//! A [`Schema`] lists the fields a value must carry and the primitive kind of
//! each. [`decode`] checks every field, collects all violations in schema
//! order, and only then builds the typed value from the declared fields.
//! Undeclared fields never reach the typed value.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Primitive kind expected for a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
}

impl FieldKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JSON type name of a value, as used in diagnostics.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Ordered field name → kind table.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    fields: &'static [(&'static str, FieldKind)],
}

impl Schema {
    pub const fn new(fields: &'static [(&'static str, FieldKind)]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldKind)> + '_ {
        self.fields.iter().copied()
    }
}

/// One structural mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    NotAnObject { actual: &'static str },
    Missing { field: &'static str, expected: FieldKind },
    WrongType { field: &'static str, expected: FieldKind, actual: &'static str },
    /// The value matched the schema but the target type rejected it.
    Unrepresentable { detail: String },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NotAnObject { actual } => write!(f, "expected an object, got {actual}"),
            Violation::Missing { field, expected } => {
                write!(f, "required property \"{field}\": missing, expected {expected}")
            }
            Violation::WrongType { field, expected, actual } => {
                write!(f, "required property \"{field}\": expected {expected}, got {actual}")
            }
            Violation::Unrepresentable { detail } => write!(f, "cannot build value: {detail}"),
        }
    }
}

/// All violations found in one value, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.draw())]
pub struct DecodeError {
    violations: Vec<Violation>,
}

impl DecodeError {
    fn single(violation: Violation) -> Self {
        Self { violations: vec![violation] }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Human readable rendering, one violation per line.
    pub fn draw(&self) -> String {
        self.violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Diagnostic payload attached to a 400 response.
    pub fn to_context(&self) -> Value {
        json!({
            "errors": self.violations,
            "detail": self.draw(),
        })
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Types that can be decoded from an untyped value through their schema.
pub trait Decode: DeserializeOwned {
    const SCHEMA: Schema;

    fn decode(raw: &Value) -> DecodeResult<Self> {
        decode(&Self::SCHEMA, raw)
    }
}

/// Check `raw` against `schema` and build a `T` from the declared fields only.
pub fn decode<T: DeserializeOwned>(schema: &Schema, raw: &Value) -> DecodeResult<T> {
    let Some(object) = raw.as_object() else {
        return Err(DecodeError::single(Violation::NotAnObject { actual: kind_of(raw) }));
    };

    let mut violations = Vec::new();
    let mut projected = Map::new();
    for (field, expected) in schema.fields() {
        match object.get(field) {
            None => violations.push(Violation::Missing { field, expected }),
            Some(value) if !expected.matches(value) => violations.push(Violation::WrongType {
                field,
                expected,
                actual: kind_of(value),
            }),
            Some(value) => {
                projected.insert(field.to_string(), value.clone());
            }
        }
    }
    if !violations.is_empty() {
        return Err(DecodeError { violations });
    }

    serde_json::from_value(Value::Object(projected))
        .map_err(|e| DecodeError::single(Violation::Unrepresentable { detail: e.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Sample {
        name: String,
        age: u32,
        admin: bool,
    }

    impl Decode for Sample {
        const SCHEMA: Schema = Schema::new(&[
            ("name", FieldKind::String),
            ("age", FieldKind::Number),
            ("admin", FieldKind::Boolean),
        ]);
    }

    #[test]
    fn decodes_well_formed_object() {
        let sample = Sample::decode(&json!({"name": "a", "age": 3, "admin": false})).unwrap();
        assert_eq!(sample, Sample { name: "a".into(), age: 3, admin: false });
    }

    #[test]
    fn drops_undeclared_fields() {
        let sample = Sample::decode(&json!({"name": "a", "age": 3, "admin": true, "extra": [1]})).unwrap();
        assert_eq!(sample.name, "a");
    }

    #[test]
    fn collects_every_violation_in_schema_order() {
        let err = Sample::decode(&json!({"age": "old", "admin": null})).unwrap_err();
        assert_eq!(
            err.violations(),
            &[
                Violation::Missing { field: "name", expected: FieldKind::String },
                Violation::WrongType { field: "age", expected: FieldKind::Number, actual: "string" },
                Violation::WrongType { field: "admin", expected: FieldKind::Boolean, actual: "null" },
            ]
        );
        assert_eq!(err.draw().lines().count(), 3);
    }

    #[test]
    fn non_object_root_is_one_violation() {
        let err = Sample::decode(&json!([1, 2])).unwrap_err();
        assert_eq!(err.violations(), &[Violation::NotAnObject { actual: "array" }]);
        assert_eq!(err.to_string(), "expected an object, got array");
    }

    #[test]
    fn empty_object_reports_all_missing() {
        let err = Sample::decode(&json!({})).unwrap_err();
        assert_eq!(err.violations().len(), 3);
    }

    #[test]
    fn target_type_rejection_is_unrepresentable() {
        // -1 is a number but not a u32
        let err = Sample::decode(&json!({"name": "a", "age": -1, "admin": true})).unwrap_err();
        assert!(matches!(err.violations(), [Violation::Unrepresentable { .. }]));
    }

    #[test]
    fn context_carries_structured_and_drawn_forms() {
        let err = Sample::decode(&json!({"name": 1, "age": 1, "admin": true})).unwrap_err();
        let ctx = err.to_context();
        assert_eq!(ctx["errors"][0]["kind"], "wrong_type");
        assert_eq!(ctx["errors"][0]["field"], "name");
        assert_eq!(ctx["errors"][0]["expected"], "string");
        assert_eq!(ctx["errors"][0]["actual"], "number");
        assert_eq!(ctx["detail"], "required property \"name\": expected string, got number");
    }

    #[test]
    fn decoding_is_repeatable() {
        let raw = json!({"name": 5});
        assert_eq!(Sample::decode(&raw).unwrap_err(), Sample::decode(&raw).unwrap_err());
    }
}
