//! In-memory substrate for tests and tools.
//!
//! [`Harness`] plays the part of the external relation substrate: it owns the
//! relations of one local unit, their remote units and every databag, and it
//! answers the [`Charm`] queries endpoints make. Raw writes through the
//! harness bypass permissions, the way a remote peer's writes would.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::construct::{Charm, Entity, RelationHandle};
use crate::schema::Role;

#[derive(Debug)]
pub struct Harness {
    app: Entity,
    unit: Entity,
    leader: AtomicBool,
    metadata: HashMap<String, Role>,
    relations: Mutex<Vec<RelationHandle>>,
    next_id: AtomicUsize,
}

impl Harness {
    /// A harness for unit `app/0`, with endpoints declared in `metadata`.
    pub fn new<'a>(app: &str, metadata: impl IntoIterator<Item = (&'a str, Role)>) -> Self {
        Self {
            app: Entity::app(app),
            unit: Entity::unit(format!("{app}/0")),
            leader: AtomicBool::new(false),
            metadata: metadata.into_iter().map(|(name, role)| (name.to_owned(), role)).collect(),
            relations: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
        }
    }
    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::SeqCst);
    }
    pub fn add_relation(&self, endpoint: &str, remote_app: &str) -> RelationHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let relation = RelationHandle::new(id, endpoint, remote_app);
        debug!(%relation, remote_app, "relation added");
        self.relations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(relation.clone());
        relation
    }
    pub fn add_relation_unit(&self, relation: &RelationHandle, unit: &str) {
        relation.add_unit(Entity::unit(unit));
    }
    pub fn remove_relation_unit(&self, relation: &RelationHandle, unit: &str) -> bool {
        relation.remove_unit(&Entity::unit(unit))
    }
    pub fn remove_relation(&self, id: usize) -> Option<RelationHandle> {
        let mut relations = self.relations.lock().unwrap_or_else(PoisonError::into_inner);
        let index = relations.iter().position(|r| r.id() == id)?;
        Some(relations.remove(index))
    }
    pub fn relation(&self, id: usize) -> Option<RelationHandle> {
        self.relations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }
    /// Raw write into the databag of the entity called `entity`.
    pub fn update_relation_data<K, V>(&self, relation: &RelationHandle, entity: &str, data: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let databag = relation.data(&Entity::from_name(entity));
        for (key, value) in data {
            databag.insert(key, value);
        }
    }
    pub fn relation_data(&self, relation: &RelationHandle, entity: &str) -> BTreeMap<String, String> {
        relation.data(&Entity::from_name(entity)).snapshot()
    }
}

impl Charm for Harness {
    fn app(&self) -> Entity {
        self.app.clone()
    }
    fn unit(&self) -> Entity {
        self.unit.clone()
    }
    fn is_leader(&self) -> bool {
        self.leader.load(Ordering::SeqCst)
    }
    fn relations(&self, endpoint: &str) -> Vec<RelationHandle> {
        self.relations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.name() == endpoint)
            .cloned()
            .collect()
    }
    fn declared_role(&self, endpoint: &str) -> Option<Role> {
        self.metadata.get(endpoint).copied()
    }
}
