//! Schema-bound validators: the pluggable backends behind every databag access.
//!
//! A [`Validator`] is bound to at most one [`Schema`] and knows how to check a
//! field name, encode a domain value to its wire string, decode it back, and
//! assess a whole raw databag. Two backends exist: the structural
//! [`RecordValidator`] and, with the `model-validator` feature, the lax
//! library-style [`crate::model::ModelValidator`]. Without a schema both
//! accept everything.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::schema::{Field, Schema};
use crate::validity::Validity;

/// Raw databag contents, as stored by the substrate.
pub type RawData = BTreeMap<String, String>;

pub trait Validator: fmt::Debug {
    fn kind(&self) -> ValidatorKind;
    fn schema(&self) -> Option<&Arc<Schema>>;
    /// Rebind to another schema (or none).
    fn bind(&mut self, schema: Option<Arc<Schema>>);

    /// `None` when there is no schema: every name is acceptable then.
    fn check_field(&self, name: &str) -> Result<Option<&Field>> {
        match self.schema() {
            None => Ok(None),
            Some(schema) => schema.field(name).map(Some).ok_or_else(|| Error::InvalidFieldName {
                name: name.to_owned(),
                schema: schema.name().to_owned(),
            }),
        }
    }
    fn serialize(&self, key: &str, value: &Value) -> Result<String>;
    fn deserialize(&self, key: &str, value: &str) -> Result<Value>;

    /// Assess a whole databag. With `raise`, invalid data is an error
    /// instead of `Validity::Invalid`; incomplete data never is.
    fn validate(&self, data: &RawData, raise: bool) -> Result<Validity> {
        let Some(schema) = self.schema() else {
            return Ok(Validity::Valid);
        };
        let assessment = assess(self, schema, data);
        conclude(schema, data, &assessment, raise)
    }
}

// ------------- Backend selection -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    Record,
    Model,
}

impl ValidatorKind {
    /// Whether this backend is compiled in.
    pub fn available(self) -> bool {
        match self {
            ValidatorKind::Record => true,
            ValidatorKind::Model => cfg!(feature = "model-validator"),
        }
    }
    /// The richest available backend.
    pub fn detect() -> Self {
        if ValidatorKind::Model.available() {
            ValidatorKind::Model
        } else {
            ValidatorKind::Record
        }
    }
    /// A fresh validator bound to `schema`.
    pub fn build(self, schema: Option<Arc<Schema>>) -> Box<dyn Validator> {
        match self {
            ValidatorKind::Record => Box::new(RecordValidator::new(schema)),
            #[cfg(feature = "model-validator")]
            ValidatorKind::Model => Box::new(crate::model::ModelValidator::new(schema)),
            #[cfg(not(feature = "model-validator"))]
            ValidatorKind::Model => {
                tracing::warn!("model validator not compiled in; falling back to record validator");
                Box::new(RecordValidator::new(schema))
            }
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidatorKind::Record => write!(f, "record"),
            ValidatorKind::Model => write!(f, "model"),
        }
    }
}

// ------------- Shared assessment -------------
/// Outcome of scanning a databag against a schema.
#[derive(Debug, Default)]
pub(crate) struct Assessment {
    pub invalid: bool,
    pub missing: bool,
    pub decoded: Map<String, Value>,
}

/// Empty strings are tombstones: they count as absent.
pub(crate) fn live(data: &RawData) -> impl Iterator<Item = (&String, &String)> {
    data.iter().filter(|(_, v)| !v.is_empty())
}

pub(crate) fn assess<V: Validator + ?Sized>(validator: &V, schema: &Schema, data: &RawData) -> Assessment {
    let mut assessment = Assessment::default();
    for (key, value) in live(data) {
        let field = match validator.check_field(key) {
            Ok(field) => field,
            Err(e) => {
                error!(%key, %value, error = %e, "invalid field name");
                assessment.invalid = true;
                continue;
            }
        };
        match validator.deserialize(key, value) {
            Ok(decoded) => {
                assessment.decoded.insert(key.clone(), decoded);
            }
            Err(e) => {
                let expected = field.map(|f| f.kind().name()).unwrap_or("any");
                error!(%key, %value, %expected, error = %e, "value cannot be cast to the expected type");
                assessment.invalid = true;
            }
        }
    }
    assessment.missing = schema
        .required()
        .any(|field| data.get(field.name()).is_none_or(|v| v.is_empty()));
    assessment
}

// missing data takes precedence over bad data
pub(crate) fn conclude(schema: &Schema, data: &RawData, assessment: &Assessment, raise: bool) -> Result<Validity> {
    if assessment.missing {
        if assessment.invalid {
            debug!(schema = %schema, "databag is both incomplete and invalid; reporting incomplete");
        }
        return Ok(Validity::Incomplete);
    }
    if assessment.invalid {
        if raise {
            return Err(Error::Validation {
                schema: schema.name().to_owned(),
                data: format!("{data:?}"),
            });
        }
        return Ok(Validity::Invalid);
    }
    Ok(Validity::Valid)
}

/// Schema-less decoding: JSON if possible, the raw text otherwise.
pub(crate) fn best_effort_decode(value: &str) -> Value {
    serde_json::from_str(value).unwrap_or_else(|_| {
        error!(%value, "unable to decode; returning it raw");
        Value::String(value.to_owned())
    })
}

// ------------- Record backend -------------
/// Validates against the declared fields only, strictly: values must already
/// be of the declared kind when written, and must instantiate that kind from
/// their text when read.
#[derive(Clone, Debug, Default)]
pub struct RecordValidator {
    schema: Option<Arc<Schema>>,
}

impl RecordValidator {
    pub fn new(schema: Option<Arc<Schema>>) -> Self {
        Self { schema }
    }
}

impl Validator for RecordValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Record
    }
    fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }
    fn bind(&mut self, schema: Option<Arc<Schema>>) {
        self.schema = schema;
    }
    fn serialize(&self, key: &str, value: &Value) -> Result<String> {
        let Some(field) = self.check_field(key)? else {
            // without a schema strings go out verbatim
            return match value {
                Value::String(s) => Ok(s.clone()),
                other => Ok(serde_json::to_string(other)?),
            };
        };
        // the value must already be of the field's kind, or it would not read back
        if !field.kind().matches(value) {
            return Err(Error::coercion(key, value, field.kind()));
        }
        Ok(serde_json::to_string(value)?)
    }
    fn deserialize(&self, key: &str, value: &str) -> Result<Value> {
        let Some(field) = self.check_field(key)? else {
            return Ok(best_effort_decode(value));
        };
        field.kind().parse(value).ok_or_else(|| {
            error!(%key, %value, expected = %field.kind(), "cannot cast; giving up");
            Error::coercion(key, value, field.kind())
        })
    }
}
