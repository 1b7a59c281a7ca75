// crates/sqlgate-core/src/core/value.rs
// ============================================================================
// Module: SQL Gate Values
// Description: Binding scalars, binding maps, and result row sets.
// Purpose: Convert between JSON wire values and engine-neutral SQL values.
// Dependencies: base64, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Bindings arrive as JSON objects (or URL query pairs) and are resolved
//! against a [`CompiledStatement`] into an ordered list of
//! [`BoundParameter`]s. Only placeholders the statement declares are
//! converted; extra keys are ignored. Results come back as a [`RowSet`]
//! that serializes to an array of objects in engine column order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde::Serializer;
use serde::ser::SerializeMap;
use serde::ser::SerializeSeq;
use serde_json::Value;
use thiserror::Error;

use crate::core::statement::CompiledStatement;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Binding resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// A declared placeholder has no value.
    #[error("missing parameter: {0}")]
    Missing(String),
    /// A supplied value cannot be bound.
    #[error("invalid parameter {name}: {reason}")]
    Invalid {
        /// Placeholder name.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },
}

// ============================================================================
// SECTION: Binding Values
// ============================================================================

/// Scalar value bound to a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
}

impl ScalarValue {
    /// Converts a JSON value into a bindable scalar.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Invalid`] for `null`, booleans, arrays,
    /// objects, and non-finite numbers.
    pub fn from_json(name: &str, value: &Value) -> Result<Self, BindingError> {
        let invalid = |reason: &str| BindingError::Invalid {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        match value {
            Value::String(text) => Ok(Self::Text(text.clone())),
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    return Ok(Self::Integer(int));
                }
                match number.as_f64() {
                    Some(real) if real.is_finite() => Ok(Self::Real(real)),
                    _ => Err(invalid("number is out of range")),
                }
            }
            Value::Null => Err(invalid("null is not a bindable value")),
            Value::Bool(_) => Err(invalid("booleans are not bindable; use 0 or 1")),
            Value::Array(_) | Value::Object(_) => {
                Err(invalid("only numbers and strings are bindable"))
            }
        }
    }
}

/// A resolved placeholder value, in statement order.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParameter {
    /// Placeholder name without the leading `:`.
    pub name: String,
    /// Value to bind.
    pub value: ScalarValue,
}

/// Parameter values supplied with a call, keyed by placeholder name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    /// Raw values keyed by normalized name.
    values: BTreeMap<String, Value>,
}

impl Bindings {
    /// Creates an empty binding map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value. A single leading `:` on the key is stripped; an
    /// unprefixed key wins over its prefixed twin.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match key.strip_prefix(':') {
            Some(stripped) => {
                if !self.values.contains_key(stripped) {
                    self.values.insert(stripped.to_string(), value);
                }
            }
            None => {
                self.values.insert(key, value);
            }
        }
    }

    /// Builds bindings from a decoded JSON object.
    #[must_use]
    pub fn from_json_object(object: serde_json::Map<String, Value>) -> Self {
        let mut bindings = Self::new();
        for (key, value) in object {
            bindings.insert(key, value);
        }
        bindings
    }

    /// Builds bindings from URL query pairs; every value is text.
    #[must_use]
    pub fn from_query_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let object = pairs.into_iter().map(|(key, value)| (key, Value::String(value))).collect();
        Self::from_json_object(object)
    }

    /// Returns the number of supplied keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no keys were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolves values for every placeholder the statement declares.
    ///
    /// # Errors
    ///
    /// Returns [`BindingError::Missing`] for the first declared placeholder
    /// without a value, and [`BindingError::Invalid`] when a value cannot be
    /// bound.
    pub fn resolve(
        &self,
        statement: &CompiledStatement,
    ) -> Result<Vec<BoundParameter>, BindingError> {
        let mut resolved = Vec::with_capacity(statement.placeholders().len());
        for name in statement.placeholders() {
            let value =
                self.values.get(name).ok_or_else(|| BindingError::Missing(name.clone()))?;
            resolved.push(BoundParameter {
                name: name.clone(),
                value: ScalarValue::from_json(name, value)?,
            });
        }
        Ok(resolved)
    }
}

// ============================================================================
// SECTION: Result Values
// ============================================================================

/// A value read back from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Integer storage class.
    Integer(i64),
    /// Real storage class.
    Real(f64),
    /// Text storage class.
    Text(String),
    /// Blob storage class; serialized as base64.
    Blob(Vec<u8>),
}

impl Serialize for SqlValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Real(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Blob(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
        }
    }
}

/// Rows returned by a statement, sharing one column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column names in engine order.
    columns: Vec<String>,
    /// Row values, each aligned with `columns`.
    rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    /// Creates an empty row set with the given columns.
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row aligned with the column list.
    pub fn push(&mut self, row: Vec<SqlValue>) {
        self.rows.push(row);
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for RowSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for values in &self.rows {
            seq.serialize_element(&RowRecord {
                columns: &self.columns,
                values,
            })?;
        }
        seq.end()
    }
}

/// One row rendered as a `{column: value}` object in column order.
struct RowRecord<'a> {
    /// Column names.
    columns: &'a [String],
    /// Row values.
    values: &'a [SqlValue],
}

impl Serialize for RowRecord<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Outcome of executing one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutput {
    /// Statement produced result columns.
    Rows(RowSet),
    /// Statement produced no result columns.
    Done {
        /// Rows changed, as reported by the engine.
        changes: u64,
    },
}

// ============================================================================
// SECTION: Tests
// ============================================================================
