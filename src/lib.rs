//! Reldata – schema validation for relation databags.
//!
//! Two applications taking part in a *relation* talk through *databags*:
//! flat string-to-string stores, one per application and one per unit on
//! each side. This crate puts a typed, validated view on top of them:
//! * A [`schema::Schema`] declares the fields of one databag, each with a
//!   [`datatype::FieldKind`], an optional default, and (for model schemas)
//!   constraints.
//! * A [`schema::Template`] bundles the app and unit schemas of both sides;
//!   resolved for the local [`schema::Role`] it becomes a
//!   [`schema::RelationModel`] with one schema per databag slot.
//! * A [`wrapper::DataWrapper`] reads and writes one databag through a
//!   [`validator::Validator`], refusing writes that would break the schema.
//! * [`relation::Relation`] and [`endpoint::Endpoint`] roll the state of many
//!   databags up into a single three-valued [`validity::Validity`].
//!
//! ## Modules
//! * [`construct`] – The boundary to the relation substrate: entities,
//!   databags, relations and the [`construct::Charm`] trait.
//! * [`harness`] – An in-memory substrate for tests and tools.
//! * [`datatype`] – Field kinds and their string/value coercion rules.
//! * [`schema`] – Fields, schemas, templates and relation models.
//! * [`validator`] – The validator trait, backend selection and the strict
//!   record backend.
//! * `model` – The lax, constraint-aware model backend (feature
//!   `model-validator`, on by default).
//! * [`validity`] – Three-valued validity and its worst-case reduction.
//! * [`settings`] – Process-wide settings and logging setup.
//!
//! ## Validity
//! Every databag is either *valid*, *incomplete* (a required field is
//! missing; waiting on the other side is expected) or *invalid* (some
//! field holds data its schema rejects). Missing fields take precedence
//! over bad ones, and aggregates report the worst state found.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use reldata::{DataBagModel, Endpoint, Field, FieldKind, Harness, Role, Schema, Template, Validity};
//!
//! let template = Template::new(
//!     Some(DataBagModel::default().with_app(Schema::record("Requirer", [Field::required("foo", FieldKind::Integer)]))),
//!     Some(DataBagModel::default().with_unit(Schema::record("Provider", [Field::required("bar", FieldKind::Float)]))),
//! );
//! let harness = Arc::new(Harness::new("local", [("db", Role::Requirer)]));
//! harness.set_leader(true);
//! let endpoint = Endpoint::builder(Arc::clone(&harness), "db")
//!     .template(template)
//!     .build()
//!     .unwrap();
//!
//! let relation = harness.add_relation("db", "remote");
//! harness.add_relation_unit(&relation, "remote/0");
//! assert_eq!(endpoint.remote_units_valid(), Validity::Incomplete);
//!
//! harness.update_relation_data(&relation, "remote/0", [("bar", "4.2")]);
//! assert_eq!(endpoint.remote_units_valid(), Validity::Valid);
//!
//! let mut app = endpoint.relation().unwrap().local_app_data();
//! assert!(app.set("foo", "not a number").is_err());
//! app.set("foo", 42).unwrap();
//! assert_eq!(harness.relation_data(&relation, "local")["foo"], "42");
//! ```

pub mod construct;
pub mod datatype;
pub mod endpoint;
pub mod error;
pub mod harness;
#[cfg(feature = "model-validator")]
pub mod model;
pub mod relation;
pub mod schema;
pub mod settings;
pub mod validator;
pub mod validity;
pub mod wrapper;

pub use construct::{Charm, Databag, Entity, RelationHandle};
pub use datatype::FieldKind;
pub use endpoint::{Endpoint, EndpointBuilder, EventKind, RelationEvent};
pub use error::{Error, Result};
pub use harness::Harness;
pub use relation::Relation;
pub use schema::{DataBagModel, Field, ModelSchema, RecordSchema, RelationModel, Role, Schema, Slot, Template};
pub use settings::Settings;
pub use validator::{RawData, Validator, ValidatorKind};
pub use validity::{Validity, worst_case};
pub use wrapper::DataWrapper;
