use std::collections::BTreeMap;
use std::sync::Arc;

use crate::construct::{Charm, Entity, RelationHandle};
use crate::schema::{RelationModel, Slot};
use crate::validator::ValidatorKind;
use crate::validity::{Validity, worst_case};
use crate::wrapper::DataWrapper;

/// One relation seen through its four databag slots.
///
/// Leadership and the remote unit set are read once, when the view is built;
/// build a new view to observe changes.
#[derive(Clone, Debug)]
pub struct Relation {
    handle: RelationHandle,
    model: Arc<RelationModel>,
    validator: ValidatorKind,
    local_app: Entity,
    local_unit: Entity,
    remote_units: Vec<Entity>,
    is_leader: bool,
}

impl Relation {
    pub fn new<C: Charm + ?Sized>(
        charm: &C,
        handle: RelationHandle,
        model: Arc<RelationModel>,
        validator: ValidatorKind,
    ) -> Self {
        Self {
            remote_units: handle.units(),
            handle,
            model,
            validator,
            local_app: charm.app(),
            local_unit: charm.unit(),
            is_leader: charm.is_leader(),
        }
    }

    /// Whether this view wraps the given substrate relation.
    pub fn wraps(&self, relation: &RelationHandle) -> bool {
        self.handle.same(relation)
    }
    pub fn relation(&self) -> &RelationHandle {
        &self.handle
    }
    pub fn id(&self) -> usize {
        self.handle.id()
    }
    pub fn name(&self) -> &str {
        self.handle.name()
    }
    pub fn remote_app(&self) -> &Entity {
        self.handle.app()
    }
    pub fn remote_units(&self) -> &[Entity] {
        &self.remote_units
    }
    pub fn local_app(&self) -> &Entity {
        &self.local_app
    }
    pub fn local_unit(&self) -> &Entity {
        &self.local_unit
    }
    pub fn is_leader(&self) -> bool {
        self.is_leader
    }
    pub fn model(&self) -> &RelationModel {
        &self.model
    }

    // a fresh validator per databag, so that slots never share a schema
    fn wrap_data(&self, entity: &Entity, slot: Slot, can_write: bool) -> DataWrapper {
        DataWrapper::new(
            &self.handle,
            entity.clone(),
            self.validator.build(self.model.get(slot)),
            can_write,
        )
    }

    /// Writable only by the leader.
    pub fn local_app_data(&self) -> DataWrapper {
        self.wrap_data(&self.local_app, Slot::LocalApp, self.is_leader)
    }
    pub fn local_unit_data(&self) -> DataWrapper {
        self.wrap_data(&self.local_unit, Slot::LocalUnit, true)
    }
    pub fn remote_app_data(&self) -> DataWrapper {
        self.wrap_data(self.handle.app(), Slot::RemoteApp, false)
    }
    pub fn remote_units_data(&self) -> BTreeMap<Entity, DataWrapper> {
        self.remote_units
            .iter()
            .map(|unit| (unit.clone(), self.wrap_data(unit, Slot::RemoteUnit, false)))
            .collect()
    }

    pub fn remote_units_valid(&self) -> Validity {
        worst_case(self.remote_units_data().values().map(DataWrapper::valid))
    }
    pub fn remote_app_valid(&self) -> Validity {
        self.remote_app_data().valid()
    }
    pub fn local_unit_valid(&self) -> Validity {
        self.local_unit_data().valid()
    }
    pub fn local_app_valid(&self) -> Validity {
        self.local_app_data().valid()
    }
    pub fn local_valid(&self) -> Validity {
        worst_case([self.local_app_valid(), self.local_unit_valid()])
    }
    pub fn remote_valid(&self) -> Validity {
        worst_case([self.remote_app_valid(), self.remote_units_valid()])
    }
    /// Whether this relation as a whole is valid.
    pub fn valid(&self) -> Validity {
        worst_case([self.local_valid(), self.remote_valid()])
    }
}
