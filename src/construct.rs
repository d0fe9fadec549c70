use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// databags are kept ordered so that printing and comparing them is stable
use std::collections::{BTreeMap, HashMap};

// used to print out readable forms of a construct
use std::fmt;

// our own stuff that we need
use crate::schema::Role;

// ------------- Entity -------------
/// An application or a unit taking part in a relation.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    App(String),
    Unit(String),
}

impl Entity {
    pub fn app(name: impl Into<String>) -> Self {
        Entity::App(name.into())
    }
    pub fn unit(name: impl Into<String>) -> Self {
        Entity::Unit(name.into())
    }
    /// Unit names look like `app/0`; anything else names an application.
    pub fn from_name(name: &str) -> Self {
        match name.split_once('/') {
            Some((app, n)) if !app.is_empty() && n.parse::<u32>().is_ok() => Entity::unit(name),
            _ => Entity::app(name),
        }
    }
    pub fn name(&self) -> &str {
        match self {
            Entity::App(name) | Entity::Unit(name) => name,
        }
    }
    pub fn is_unit(&self) -> bool {
        matches!(self, Entity::Unit(_))
    }
    pub fn kind_name(&self) -> &'static str {
        match self {
            Entity::App(_) => "Application",
            Entity::Unit(_) => "Unit",
        }
    }
    /// The application a unit belongs to; an application is its own.
    pub fn app_of(&self) -> Entity {
        match self {
            Entity::App(_) => self.clone(),
            Entity::Unit(name) => Entity::app(name.split_once('/').map_or(name.as_str(), |(app, _)| app)),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ------------- Databag -------------
/// Handle to one raw string-to-string store; clones share the storage.
///
/// The substrate has no true delete: writing the empty string is the
/// tombstone convention.
#[derive(Clone, Debug, Default)]
pub struct Databag(Arc<Mutex<BTreeMap<String, String>>>);

impl Databag {
    pub fn new() -> Self {
        Self::default()
    }
    // a panic elsewhere cannot leave a plain map half-written, so poisoning is ignored
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.lock().insert(key.into(), value.into());
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
    pub fn len(&self) -> usize {
        self.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.lock().clone()
    }
    pub fn same(&self, other: &Databag) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

// ------------- Relation -------------
#[derive(Debug)]
struct RelationState {
    id: usize,
    name: String,
    app: Entity,
    units: Mutex<Vec<Entity>>,
    data: Mutex<HashMap<Entity, Databag>>,
}

/// One live link between the local application and a remote one, as the
/// substrate hands it out. Clones refer to the same relation.
#[derive(Clone, Debug)]
pub struct RelationHandle {
    state: Arc<RelationState>,
}

impl RelationHandle {
    pub fn new(id: usize, name: impl Into<String>, remote_app: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RelationState {
                id,
                name: name.into(),
                app: Entity::app(remote_app),
                units: Mutex::new(Vec::new()),
                data: Mutex::new(HashMap::new()),
            }),
        }
    }
    pub fn id(&self) -> usize {
        self.state.id
    }
    /// The endpoint this relation lives on.
    pub fn name(&self) -> &str {
        &self.state.name
    }
    pub fn app(&self) -> &Entity {
        &self.state.app
    }
    pub fn units(&self) -> Vec<Entity> {
        self.state.units.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
    pub fn add_unit(&self, unit: Entity) {
        let mut units = self.state.units.lock().unwrap_or_else(PoisonError::into_inner);
        if !units.contains(&unit) {
            units.push(unit);
        }
    }
    pub fn remove_unit(&self, unit: &Entity) -> bool {
        let mut units = self.state.units.lock().unwrap_or_else(PoisonError::into_inner);
        let before = units.len();
        units.retain(|u| u != unit);
        before != units.len()
    }
    /// The databag of `entity` in this relation, created empty on first access.
    pub fn data(&self, entity: &Entity) -> Databag {
        self.state
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(entity.clone())
            .or_default()
            .clone()
    }
    pub fn same(&self, other: &RelationHandle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Display for RelationHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.state.name, self.state.id)
    }
}

// ------------- Charm -------------
/// What the local process exposes about itself and its relations.
pub trait Charm {
    fn app(&self) -> Entity;
    fn unit(&self) -> Entity;
    fn is_leader(&self) -> bool;
    /// Relations currently alive on `endpoint`.
    fn relations(&self, endpoint: &str) -> Vec<RelationHandle>;
    /// The role `endpoint` is declared with in the charm's metadata, if any.
    fn declared_role(&self, endpoint: &str) -> Option<Role>;
}
