//! Databag schemas and the templates that place them on either side of a relation.
//!
//! A [`Schema`] is one of two explicit kinds: a plain [`RecordSchema`] (field
//! names, kinds and defaults) or a richer [`ModelSchema`] that additionally
//! carries per-field constraints and an optional typed check of the whole
//! record. A [`Template`] pairs the provider and requirer [`DataBagModel`]s of
//! an integration and resolves, for a given [`Role`], into the four-slot
//! [`RelationModel`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::datatype::FieldKind;
use crate::error::Error;

// ------------- Field -------------
/// Constraints only the model backend enforces.
#[derive(Clone, Debug, Default)]
pub struct Constraints {
    /// Compiled when the field is declared.
    pub pattern: Option<Regex>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub choices: Vec<Value>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.min.is_none() && self.max.is_none() && self.choices.is_empty()
    }
}

impl PartialEq for Constraints {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_ref().map(Regex::as_str) == other.pattern.as_ref().map(Regex::as_str)
            && self.min == other.min
            && self.max == other.max
            && self.choices == other.choices
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    default: Option<Value>,
    constraints: Constraints,
}

impl Field {
    /// A field without a default; the databag is incomplete until it is set.
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            constraints: Constraints::default(),
        }
    }
    pub fn optional(name: impl Into<String>, kind: FieldKind, default: impl Into<Value>) -> Self {
        Self {
            default: Some(default.into()),
            ..Self::required(name, kind)
        }
    }
    /// Strings must match `pattern`; a pattern that does not compile is rejected here.
    pub fn with_pattern(mut self, pattern: &str) -> crate::error::Result<Self> {
        let compiled = Regex::new(pattern).map_err(|e| Error::InvalidPattern {
            field: self.name.clone(),
            pattern: pattern.to_owned(),
            reason: e.to_string(),
        })?;
        self.constraints.pattern = Some(compiled);
        Ok(self)
    }
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.constraints.min = min;
        self.constraints.max = max;
        self
    }
    pub fn with_choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.constraints.choices = choices.into_iter().map(Into::into).collect();
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> FieldKind {
        self.kind
    }
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }
}

// ------------- Schemas -------------
/// Structural schema: nothing but declared fields.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordSchema {
    name: String,
    fields: Vec<Field>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().collect(),
        }
    }
}

type Check = dyn Fn(&Value) -> std::result::Result<(), String> + Send + Sync;

/// Typed check of a whole record, delegated to serde.
#[derive(Clone)]
pub struct RecordCheck(Arc<Check>);

impl RecordCheck {
    pub fn of<T: DeserializeOwned>() -> Self {
        Self(Arc::new(|record: &Value| {
            serde_json::from_value::<T>(record.clone())
                .map(|_| ())
                .map_err(|e| e.to_string())
        }))
    }
    pub fn run(&self, record: &Value) -> std::result::Result<(), String> {
        (self.0)(record)
    }
}

impl fmt::Debug for RecordCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "RecordCheck")
    }
}

/// Library-backed schema: fields with constraints plus an optional typed check.
#[derive(Clone, Debug)]
pub struct ModelSchema {
    name: String,
    fields: Vec<Field>,
    check: Option<RecordCheck>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().collect(),
            check: None,
        }
    }
    /// Also require the decoded record to deserialize into `T`.
    pub fn typed<T: DeserializeOwned>(mut self) -> Self {
        self.check = Some(RecordCheck::of::<T>());
        self
    }
    pub fn check(&self) -> Option<&RecordCheck> {
        self.check.as_ref()
    }
}

impl PartialEq for ModelSchema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Schema {
    Record(RecordSchema),
    Model(ModelSchema),
}

impl Schema {
    pub fn record(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Schema::Record(RecordSchema::new(name, fields))
    }
    pub fn model(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Schema::Model(ModelSchema::new(name, fields))
    }
    pub fn name(&self) -> &str {
        match self {
            Schema::Record(r) => &r.name,
            Schema::Model(m) => &m.name,
        }
    }
    pub fn fields(&self) -> &[Field] {
        match self {
            Schema::Record(r) => &r.fields,
            Schema::Model(m) => &m.fields,
        }
    }
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }
    pub fn required(&self) -> impl Iterator<Item = &Field> {
        self.fields().iter().filter(|f| f.is_required())
    }
    /// Declared defaults, one flat level deep.
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.fields()
            .iter()
            .filter_map(|f| f.default.as_ref().map(|d| (f.name.clone(), d.clone())))
            .collect()
    }
    pub fn check(&self) -> Option<&RecordCheck> {
        match self {
            Schema::Record(_) => None,
            Schema::Model(m) => m.check(),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<RecordSchema> for Schema {
    fn from(r: RecordSchema) -> Self {
        Schema::Record(r)
    }
}

impl From<ModelSchema> for Schema {
    fn from(m: ModelSchema) -> Self {
        Schema::Model(m)
    }
}

// a schema is described as {field name: kind name}
impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields().len()))?;
        for field in self.fields() {
            map.serialize_entry(field.name(), field.kind().name())?;
        }
        map.end()
    }
}

// ------------- Roles and slots -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Provider,
    Requirer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::Provider => write!(f, "provider"),
            Role::Requirer => write!(f, "requirer"),
        }
    }
}

/// The four databags of a relation, as seen from the local side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    LocalApp,
    RemoteApp,
    LocalUnit,
    RemoteUnit,
}

// ------------- Templates -------------
/// App and unit schemas published by one side of an integration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataBagModel {
    pub app: Option<Arc<Schema>>,
    pub unit: Option<Arc<Schema>>,
}

impl DataBagModel {
    pub fn new(app: Option<Schema>, unit: Option<Schema>) -> Self {
        Self {
            app: app.map(Arc::new),
            unit: unit.map(Arc::new),
        }
    }
    pub fn with_app(mut self, schema: impl Into<Schema>) -> Self {
        self.app = Some(Arc::new(schema.into()));
        self
    }
    pub fn with_unit(mut self, schema: impl Into<Schema>) -> Self {
        self.unit = Some(Arc::new(schema.into()));
        self
    }
}

impl Serialize for DataBagModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("app", &self.app.as_deref())?;
        map.serialize_entry("unit", &self.unit.as_deref())?;
        map.end()
    }
}

/// Provider and requirer sides of an integration.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Template {
    pub requirer: Option<DataBagModel>,
    pub provider: Option<DataBagModel>,
}

impl Template {
    pub fn new(requirer: Option<DataBagModel>, provider: Option<DataBagModel>) -> Self {
        Self { requirer, provider }
    }
    pub fn as_requirer_model(&self) -> RelationModel {
        RelationModel::sided(self.requirer.as_ref(), self.provider.as_ref())
    }
    pub fn as_provider_model(&self) -> RelationModel {
        RelationModel::sided(self.provider.as_ref(), self.requirer.as_ref())
    }
    pub fn as_model(&self, role: Role) -> RelationModel {
        match role {
            Role::Provider => self.as_provider_model(),
            Role::Requirer => self.as_requirer_model(),
        }
    }
}

/// A template resolved for one role: which schema governs each databag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationModel {
    pub local_app: Option<Arc<Schema>>,
    pub remote_app: Option<Arc<Schema>>,
    pub local_unit: Option<Arc<Schema>>,
    pub remote_unit: Option<Arc<Schema>>,
}

impl RelationModel {
    fn sided(local: Option<&DataBagModel>, remote: Option<&DataBagModel>) -> Self {
        Self {
            local_app: local.and_then(|m| m.app.clone()),
            remote_app: remote.and_then(|m| m.app.clone()),
            local_unit: local.and_then(|m| m.unit.clone()),
            remote_unit: remote.and_then(|m| m.unit.clone()),
        }
    }
    /// No template means no schema anywhere.
    pub fn resolve(template: Option<&Template>, role: Role) -> Self {
        template.map(|t| t.as_model(role)).unwrap_or_default()
    }
    pub fn get(&self, slot: Slot) -> Option<Arc<Schema>> {
        match slot {
            Slot::LocalApp => self.local_app.clone(),
            Slot::RemoteApp => self.remote_app.clone(),
            Slot::LocalUnit => self.local_unit.clone(),
            Slot::RemoteUnit => self.remote_unit.clone(),
        }
    }
}
