//! A named integration point and every relation alive on it.
//!
//! An [`Endpoint`] is built once per local application for an endpoint name.
//! It resolves the template for the local role, hands out fresh [`Relation`]
//! views on every access, rolls validity up across all of them, and is the
//! hook the host calls with relation lifecycle events ([`Endpoint::dispatch`]).
//!
//! ```
//! use std::sync::Arc;
//! use reldata::{DataBagModel, Endpoint, Field, FieldKind, Harness, RelationEvent, Role, Schema, Template};
//!
//! let harness = Arc::new(Harness::new("local", [("db", Role::Requirer)]));
//! let template = Template::new(
//!     Some(DataBagModel::default().with_unit(Schema::record("Unit", [Field::optional("port", FieldKind::Integer, 5432)]))),
//!     None,
//! );
//! let endpoint = Endpoint::builder(Arc::clone(&harness), "db")
//!     .requirer_template(template)
//!     .build()
//!     .unwrap();
//!
//! let relation = harness.add_relation("db", "postgres");
//! endpoint.dispatch(&RelationEvent::created(relation)).unwrap();
//! assert_eq!(endpoint.relation().unwrap().local_unit_data().get("port").unwrap(), 5432);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::construct::{Charm, Entity, RelationHandle};
use crate::error::{Error, Result};
use crate::relation::Relation;
use crate::schema::{RelationModel, Role, Template};
use crate::settings;
use crate::validator::ValidatorKind;
use crate::validity::{Validity, worst_case};
use crate::wrapper::DataWrapper;

// ------------- Events -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Joined,
    Changed,
    Departed,
    Broken,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EventKind::Created => "relation-created",
            EventKind::Joined => "relation-joined",
            EventKind::Changed => "relation-changed",
            EventKind::Departed => "relation-departed",
            EventKind::Broken => "relation-broken",
        };
        write!(f, "{name}")
    }
}

/// A relation lifecycle event, as delivered by the host.
#[derive(Clone, Debug)]
pub struct RelationEvent {
    pub kind: EventKind,
    pub relation: RelationHandle,
    /// The remote unit the event is about, for joined/changed/departed.
    pub unit: Option<Entity>,
}

impl RelationEvent {
    pub fn new(kind: EventKind, relation: RelationHandle) -> Self {
        Self { kind, relation, unit: None }
    }
    pub fn created(relation: RelationHandle) -> Self {
        Self::new(EventKind::Created, relation)
    }
    pub fn joined(relation: RelationHandle, unit: Entity) -> Self {
        Self { unit: Some(unit), ..Self::new(EventKind::Joined, relation) }
    }
    pub fn changed(relation: RelationHandle) -> Self {
        Self::new(EventKind::Changed, relation)
    }
    pub fn departed(relation: RelationHandle, unit: Entity) -> Self {
        Self { unit: Some(unit), ..Self::new(EventKind::Departed, relation) }
    }
    pub fn broken(relation: RelationHandle) -> Self {
        Self::new(EventKind::Broken, relation)
    }
}

pub type Handler<C> = Box<dyn Fn(&Endpoint<C>, &RelationEvent) -> Result<()>>;

// ------------- Builder -------------
pub struct EndpointBuilder<C: Charm> {
    charm: Arc<C>,
    name: String,
    template: Option<Template>,
    role: Option<Role>,
    shorthands: Vec<Role>,
    validator: Option<ValidatorKind>,
    handlers: HashMap<EventKind, Handler<C>>,
}

impl<C: Charm> EndpointBuilder<C> {
    pub fn template(mut self, template: Template) -> Self {
        self.template = Some(template);
        self
    }
    /// Which side the local application plays; only used when the charm
    /// does not declare the endpoint itself.
    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
    /// Shorthand for `template(t).role(Role::Requirer)`.
    pub fn requirer_template(mut self, template: Template) -> Self {
        self.shorthands.push(Role::Requirer);
        self.template(template).role(Role::Requirer)
    }
    /// Shorthand for `template(t).role(Role::Provider)`.
    pub fn provider_template(mut self, template: Template) -> Self {
        self.shorthands.push(Role::Provider);
        self.template(template).role(Role::Provider)
    }
    /// Pin a validator backend instead of the configured default.
    pub fn validator(mut self, kind: ValidatorKind) -> Self {
        self.validator = Some(kind);
        self
    }
    pub fn on(mut self, kind: EventKind, handler: impl Fn(&Endpoint<C>, &RelationEvent) -> Result<()> + 'static) -> Self {
        self.handlers.insert(kind, Box::new(handler));
        self
    }
    pub fn on_created(self, handler: impl Fn(&Endpoint<C>, &RelationEvent) -> Result<()> + 'static) -> Self {
        self.on(EventKind::Created, handler)
    }
    pub fn on_joined(self, handler: impl Fn(&Endpoint<C>, &RelationEvent) -> Result<()> + 'static) -> Self {
        self.on(EventKind::Joined, handler)
    }
    pub fn on_changed(self, handler: impl Fn(&Endpoint<C>, &RelationEvent) -> Result<()> + 'static) -> Self {
        self.on(EventKind::Changed, handler)
    }
    pub fn on_departed(self, handler: impl Fn(&Endpoint<C>, &RelationEvent) -> Result<()> + 'static) -> Self {
        self.on(EventKind::Departed, handler)
    }
    pub fn on_broken(self, handler: impl Fn(&Endpoint<C>, &RelationEvent) -> Result<()> + 'static) -> Self {
        self.on(EventKind::Broken, handler)
    }

    pub fn build(self) -> Result<Endpoint<C>> {
        if self.shorthands.contains(&Role::Provider) && self.shorthands.contains(&Role::Requirer) {
            return Err(Error::Config(format!(
                "endpoint {}: provider and requirer templates are mutually exclusive",
                self.name
            )));
        }
        if self.template.is_some() && self.role.is_none() {
            warn!(endpoint = %self.name, "template given without a role");
        }
        let declared = self.charm.declared_role(&self.name);
        if let (Some(declared), Some(hint)) = (declared, self.role) {
            if declared != hint {
                warn!(endpoint = %self.name, %declared, %hint, "role hint disagrees with the charm metadata; using the declared role");
            }
        }
        let role = declared.or(self.role).unwrap_or(Role::Provider);
        let model = RelationModel::resolve(self.template.as_ref(), role);
        let validator = self.validator.unwrap_or_else(|| settings::global().validator_kind());
        debug!(endpoint = %self.name, %role, %validator, "endpoint bound");
        Ok(Endpoint {
            charm: self.charm,
            name: self.name,
            role,
            model: Arc::new(model),
            validator,
            handlers: self.handlers,
            current: Mutex::new(None),
        })
    }
}

// ------------- Endpoint -------------
pub struct Endpoint<C: Charm> {
    charm: Arc<C>,
    name: String,
    role: Role,
    model: Arc<RelationModel>,
    validator: ValidatorKind,
    handlers: HashMap<EventKind, Handler<C>>,
    current: Mutex<Option<RelationHandle>>,
}

// restores whatever was current before, also when a handler fails
struct CurrentGuard<'a> {
    slot: &'a Mutex<Option<RelationHandle>>,
    previous: Option<RelationHandle>,
}

impl Drop for CurrentGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = self.previous.take();
    }
}

impl<C: Charm> Endpoint<C> {
    pub fn builder(charm: Arc<C>, name: impl Into<String>) -> EndpointBuilder<C> {
        EndpointBuilder {
            charm,
            name: name.into(),
            template: None,
            role: None,
            shorthands: Vec::new(),
            validator: None,
            handlers: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn role(&self) -> Role {
        self.role
    }
    pub fn model(&self) -> &RelationModel {
        &self.model
    }
    pub fn validator(&self) -> ValidatorKind {
        self.validator
    }
    pub fn charm(&self) -> &C {
        &self.charm
    }
    pub fn local_app(&self) -> Entity {
        self.charm.app()
    }
    pub fn local_unit(&self) -> Entity {
        self.charm.unit()
    }

    // ------------- Events -------------
    /// Deliver a lifecycle event: defaults are published on creation, then
    /// the handler registered for the event runs with the event's relation
    /// bound as [`Endpoint::current`].
    pub fn dispatch(&self, event: &RelationEvent) -> Result<()> {
        if event.kind == EventKind::Created {
            self.publish_defaults(&self.wrap(&event.relation))?;
        }
        let Some(handler) = self.handlers.get(&event.kind) else {
            return Ok(());
        };
        let _guard = self.bind(event.relation.clone());
        debug!(endpoint = %self.name, relation = %event.relation, event = %event.kind, "dispatching");
        handler(self, event)
    }

    fn bind(&self, relation: RelationHandle) -> CurrentGuard<'_> {
        let previous = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(relation);
        CurrentGuard { slot: &self.current, previous }
    }

    /// The relation of the event being handled right now.
    pub fn current(&self) -> Result<Relation> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner).clone();
        current
            .map(|handle| self.wrap(&handle))
            .ok_or_else(|| Error::UnboundEndpoint { endpoint: self.name.clone() })
    }

    /// The one relation alive on this endpoint.
    pub fn relation(&self) -> Result<Relation> {
        let mut relations = self.relations();
        match relations.len() {
            0 => Err(Error::UnboundEndpoint { endpoint: self.name.clone() }),
            1 => Ok(relations.remove(0)),
            count => Err(Error::TooManyRelations { endpoint: self.name.clone(), count }),
        }
    }

    /// Publish default unit and app data to the local databags.
    ///
    /// Only keys absent from the databag are written, so values set since
    /// (and tombstones) are left alone.
    pub fn publish_defaults(&self, relation: &Relation) -> Result<()> {
        if relation.is_leader() {
            Self::write_defaults(relation.local_app_data())?;
        }
        Self::write_defaults(relation.local_unit_data())
    }

    fn write_defaults(mut data: DataWrapper) -> Result<()> {
        for (key, value) in data.defaults() {
            if data.contains_key(&key) {
                continue;
            }
            debug!(relation = data.relation_name(), entity = %data.entity(), %key, %value, "publishing default");
            data.set(&key, value)?;
        }
        Ok(())
    }

    // ------------- Relations -------------
    pub fn wrap(&self, relation: &RelationHandle) -> Relation {
        Relation::new(self.charm.as_ref(), relation.clone(), Arc::clone(&self.model), self.validator)
    }

    /// All relations currently alive on this endpoint.
    pub fn relations(&self) -> Vec<Relation> {
        self.charm
            .relations(&self.name)
            .iter()
            .map(|handle| self.wrap(handle))
            .collect()
    }

    /// Local app databags, keyed by the remote application of each relation.
    pub fn local_apps_data(&self) -> BTreeMap<Entity, DataWrapper> {
        self.relations()
            .iter()
            .map(|r| (r.remote_app().clone(), r.local_app_data()))
            .collect()
    }
    pub fn remote_apps_data(&self) -> BTreeMap<Entity, DataWrapper> {
        self.relations()
            .iter()
            .map(|r| (r.remote_app().clone(), r.remote_app_data()))
            .collect()
    }
    /// Local unit databag, keyed by the local unit; the last relation wins.
    pub fn local_units_data(&self) -> BTreeMap<Entity, DataWrapper> {
        self.relations()
            .iter()
            .map(|r| (r.local_unit().clone(), r.local_unit_data()))
            .collect()
    }
    pub fn remote_units_data(&self) -> BTreeMap<Entity, DataWrapper> {
        self.relations()
            .iter()
            .flat_map(Relation::remote_units_data)
            .collect()
    }

    // ------------- Validity -------------
    // nothing local to violate without relations; remote data is expected but absent
    fn roll_up(&self, empty: Validity, per_relation: impl Fn(&Relation) -> Validity) -> Validity {
        let relations = self.relations();
        if relations.is_empty() {
            return empty;
        }
        worst_case(relations.iter().map(per_relation))
    }

    pub fn remote_units_valid(&self) -> Validity {
        self.roll_up(Validity::Incomplete, Relation::remote_units_valid)
    }
    pub fn remote_apps_valid(&self) -> Validity {
        self.roll_up(Validity::Incomplete, Relation::remote_app_valid)
    }
    pub fn local_unit_valid(&self) -> Validity {
        self.roll_up(Validity::Valid, Relation::local_unit_valid)
    }
    pub fn local_app_valid(&self) -> Validity {
        self.roll_up(Validity::Valid, Relation::local_app_valid)
    }
    pub fn remote_valid(&self) -> Validity {
        self.roll_up(Validity::Incomplete, Relation::remote_valid)
    }
    pub fn local_valid(&self) -> Validity {
        self.roll_up(Validity::Valid, Relation::local_valid)
    }
    /// Whether every relation on this endpoint is valid as a whole.
    pub fn valid(&self) -> Validity {
        self.roll_up(Validity::Incomplete, Relation::valid)
    }
}

impl<C: Charm> fmt::Debug for Endpoint<C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("model", &self.model)
            .field("validator", &self.validator)
            .finish()
    }
}
