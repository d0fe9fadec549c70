//! Validating key/value view over one databag.
//!
//! A [`DataWrapper`] is built fresh for every access to a relation side. It
//! owns nothing but a handle to the substrate's databag, the validator bound
//! to that databag's schema, and the write capability decided when it was
//! built. Writes go straight to the databag; there is no commit step.
//!
//! Every mutating call checks, in order: write permission, field name,
//! coercion, and only then touches the databag, so a failed call leaves the
//! databag exactly as it was.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::construct::{Databag, Entity, RelationHandle};
use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::validator::{RawData, Validator};
use crate::validity::Validity;

pub struct DataWrapper {
    relation: String,
    entity: Entity,
    data: Databag,
    validator: Box<dyn Validator>,
    can_write: bool,
}

impl DataWrapper {
    pub fn new(relation: &RelationHandle, entity: Entity, validator: Box<dyn Validator>, can_write: bool) -> Self {
        Self {
            relation: relation.name().to_owned(),
            data: relation.data(&entity),
            entity,
            validator,
            can_write,
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.can_write {
            Ok(())
        } else {
            Err(Error::CannotWrite {
                relation: self.relation.clone(),
                entity: self.entity.to_string(),
            })
        }
    }

    /// Decoded value of `key`.
    pub fn get(&self, key: &str) -> Result<Value> {
        self.validator.check_field(key)?;
        let raw = self.data.get(key).ok_or_else(|| Error::KeyNotFound {
            key: key.to_owned(),
            entity: self.entity.to_string(),
        })?;
        self.validator.deserialize(key, &raw)
    }

    /// Decoded value of `key`, deserialized further into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.get(key)?;
        serde_json::from_value(value.clone())
            .map_err(|_| Error::coercion(key, value, std::any::type_name::<T>()))
    }

    pub fn set<V: Serialize>(&mut self, key: &str, value: V) -> Result<()> {
        self.ensure_writable()?;
        self.validator.check_field(key)?;
        let value = serde_json::to_value(value).map_err(|e| Error::coercion(key, e, "a JSON value"))?;
        let encoded = self.validator.serialize(key, &value)?;
        self.data.insert(key, encoded);
        Ok(())
    }

    /// Tombstones `key`: the entry stays, with an empty value.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        self.ensure_writable()?;
        self.validator.check_field(key)?;
        self.data.insert(key, "");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    /// Raw keys, tombstones included.
    pub fn keys(&self) -> Vec<String> {
        self.data.keys()
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
    pub fn raw(&self) -> RawData {
        self.data.snapshot()
    }

    /// Whether this databag as a whole is valid.
    pub fn valid(&self) -> Validity {
        // never fails without `raise`
        self.validator
            .validate(&self.data.snapshot(), false)
            .unwrap_or(Validity::Invalid)
    }
    /// Validate the databag and fail if it is invalid.
    pub fn validate(&self) -> Result<Validity> {
        self.validator.validate(&self.data.snapshot(), true)
    }

    pub fn can_write(&self) -> bool {
        self.can_write
    }
    pub fn entity(&self) -> &Entity {
        &self.entity
    }
    pub fn relation_name(&self) -> &str {
        &self.relation
    }
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.validator.schema()
    }
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.schema().map(|s| s.defaults()).unwrap_or_default()
    }
}

impl PartialEq for DataWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.data.same(&other.data) || self.data.snapshot() == other.data.snapshot()
    }
}

impl PartialEq<RawData> for DataWrapper {
    fn eq(&self, other: &RawData) -> bool {
        self.data.snapshot() == *other
    }
}

impl fmt::Debug for DataWrapper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DataWrapper")
            .field("relation", &self.relation)
            .field("entity", &self.entity)
            .field("data", &self.data.snapshot())
            .field("validator", &self.validator)
            .field("can_write", &self.can_write)
            .finish()
    }
}

impl fmt::Display for DataWrapper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<{}[{}:: {}] {:?} ({})>",
            self.relation,
            self.entity.kind_name(),
            self.entity,
            self.data.snapshot(),
            self.valid()
        )
    }
}
