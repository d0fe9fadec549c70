use serde_json::Value;
use tracing::{debug, error};

use std::sync::Arc;

use crate::datatype::FieldKind;
use crate::error::{Error, Result};
use crate::schema::{Field, Schema};
use crate::validator::{RawData, Validator, ValidatorKind, assess, best_effort_decode, conclude, live};
use crate::validity::Validity;

/// Library-style validator: lax coercion into the declared kinds, field
/// constraints, and the schema's typed record check when it has one.
///
/// Without a schema every value (strings included) is JSON-encoded.
#[derive(Clone, Debug, Default)]
pub struct ModelValidator {
    schema: Option<Arc<Schema>>,
}

impl ModelValidator {
    pub fn new(schema: Option<Arc<Schema>>) -> Self {
        Self { schema }
    }

    /// Coerce an already decoded value into the type of field `key`.
    pub fn coerce(&self, key: &str, value: &Value) -> Result<Value> {
        let Some(field) = self.check_field(key)? else {
            return Ok(value.clone());
        };
        let coerced = field.kind().coerce(value).ok_or_else(|| {
            error!(%key, %value, expected = %field.kind(), "cannot coerce");
            Error::coercion(key, value, field.kind())
        })?;
        if let Err(reason) = check_constraints(field, &coerced) {
            error!(%key, %value, %reason, "constraint violated");
            return Err(Error::coercion(key, value, reason));
        }
        Ok(coerced)
    }
}

impl Validator for ModelValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Model
    }
    fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }
    fn bind(&mut self, schema: Option<Arc<Schema>>) {
        self.schema = schema;
    }
    fn serialize(&self, key: &str, value: &Value) -> Result<String> {
        // what goes out is the coerced value, so it reads back unchanged
        let coerced = self.coerce(key, value)?;
        Ok(serde_json::to_string(&coerced)?)
    }
    fn deserialize(&self, key: &str, value: &str) -> Result<Value> {
        let Some(field) = self.check_field(key)? else {
            return Ok(best_effort_decode(value));
        };
        // a string field reads a quoted literal, or else the text as it is
        if field.kind() == FieldKind::String {
            let text = field.kind().parse(value).unwrap_or_else(|| Value::String(value.to_owned()));
            return self.coerce(key, &text);
        }
        let decoded = match serde_json::from_str::<Value>(value) {
            Ok(decoded) => decoded,
            Err(e) => {
                error!(%key, %value, error = %e, "not a JSON document");
                return Err(Error::coercion(key, value, field.kind()));
            }
        };
        self.coerce(key, &decoded)
    }
    fn validate(&self, data: &RawData, raise: bool) -> Result<Validity> {
        let Some(schema) = self.schema() else {
            return Ok(Validity::Valid);
        };
        let mut assessment = assess(self, schema, data);
        if !assessment.invalid && !assessment.missing {
            if let Some(check) = schema.check() {
                let mut record = assessment.decoded.clone();
                for (key, default) in schema.defaults() {
                    record.entry(key).or_insert(default);
                }
                if let Err(e) = check.run(&Value::Object(record)) {
                    debug!(schema = %schema, error = %e, "typed record check failed");
                    assessment.invalid = true;
                }
            }
        }
        // nothing there at all: not yet filled rather than wrong
        if assessment.invalid && live(data).next().is_none() {
            return Ok(Validity::Incomplete);
        }
        conclude(schema, data, &assessment, raise)
    }
}

fn check_constraints(field: &Field, value: &Value) -> std::result::Result<(), String> {
    let constraints = field.constraints();
    if let (Some(pattern), Value::String(s)) = (&constraints.pattern, value) {
        if !pattern.is_match(s) {
            return Err(format!("{s:?} does not match {}", pattern.as_str()));
        }
    }
    if let Some(n) = value.as_f64() {
        if let Some(min) = constraints.min.filter(|min| n < *min) {
            return Err(format!("{n} is below {min}"));
        }
        if let Some(max) = constraints.max.filter(|max| n > *max) {
            return Err(format!("{n} is above {max}"));
        }
    }
    if !constraints.choices.is_empty() && !constraints.choices.contains(value) {
        return Err(format!("{value} is not one of {:?}", constraints.choices));
    }
    Ok(())
}
