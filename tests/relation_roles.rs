use std::sync::Arc;

use serde_json::json;

use reldata::{
    DataBagModel, Endpoint, Entity, Field, FieldKind, Harness, RelationModel, Role, Schema, Slot, Template,
};

fn bar_template() -> Template {
    Template::new(
        Some(
            DataBagModel::default()
                .with_app(Schema::record("RequirerApp", [Field::required("foo", FieldKind::Integer)]))
                .with_unit(Schema::record("RequirerUnit", [])),
        ),
        Some(
            DataBagModel::default()
                .with_app(Schema::record("ProviderApp", []))
                .with_unit(Schema::record("ProviderUnit", [Field::required("bar", FieldKind::Float)])),
        ),
    )
}

fn slot_name(model: &RelationModel, slot: Slot) -> Option<String> {
    model.get(slot).map(|schema| schema.name().to_owned())
}

fn endpoint_for(declared: Option<Role>, build: impl FnOnce(reldata::EndpointBuilder<Harness>) -> reldata::EndpointBuilder<Harness>) -> Endpoint<Harness> {
    let metadata: Vec<(&str, Role)> = declared.into_iter().map(|role| ("foo", role)).collect();
    let harness = Arc::new(Harness::new("local", metadata));
    let relation = harness.add_relation("foo", "remote");
    harness.add_relation_unit(&relation, "remote/0");
    build(Endpoint::builder(harness, "foo")).build().expect("endpoint")
}

#[test]
fn provider_model_from_charm() {
    let endpoint = endpoint_for(Some(Role::Provider), |b| b.provider_template(bar_template()));
    assert_eq!(endpoint.role(), Role::Provider);
    let model = endpoint.model();
    assert_eq!(slot_name(model, Slot::LocalApp).as_deref(), Some("ProviderApp"));
    assert_eq!(slot_name(model, Slot::LocalUnit).as_deref(), Some("ProviderUnit"));
    assert_eq!(slot_name(model, Slot::RemoteApp).as_deref(), Some("RequirerApp"));
    assert_eq!(slot_name(model, Slot::RemoteUnit).as_deref(), Some("RequirerUnit"));
}

#[test]
fn requirer_model_from_charm() {
    let endpoint = endpoint_for(Some(Role::Requirer), |b| b.requirer_template(bar_template()));
    assert_eq!(endpoint.role(), Role::Requirer);
    assert_eq!(*endpoint.model(), bar_template().as_requirer_model());
    assert_eq!(slot_name(endpoint.model(), Slot::LocalApp).as_deref(), Some("RequirerApp"));
    assert_eq!(slot_name(endpoint.model(), Slot::RemoteUnit).as_deref(), Some("ProviderUnit"));
}

#[test]
fn relation_interface() {
    let endpoint = endpoint_for(Some(Role::Provider), |b| b.provider_template(bar_template()));
    let relations = endpoint.relations();
    assert_eq!(relations.len(), 1);
    let relation = &relations[0];
    assert_eq!(relation.name(), "foo");
    assert_eq!(relation.remote_app(), &Entity::app("remote"));
    assert_eq!(relation.local_app(), &Entity::app("local"));
    assert_eq!(relation.local_unit(), &Entity::unit("local/0"));
    assert_eq!(relation.remote_units(), &[Entity::unit("remote/0")]);
}

#[test]
fn declared_role_beats_the_hint() {
    // declared requirer, but handed the template as provider
    let endpoint = endpoint_for(Some(Role::Requirer), |b| b.provider_template(bar_template()));
    assert_eq!(endpoint.role(), Role::Requirer);
    assert_eq!(slot_name(endpoint.model(), Slot::LocalApp).as_deref(), Some("RequirerApp"));
}

#[test]
fn hint_or_provider_without_declaration() {
    let endpoint = endpoint_for(None, |b| b.template(bar_template()).role(Role::Requirer));
    assert_eq!(endpoint.role(), Role::Requirer);

    let endpoint = endpoint_for(None, |b| b.template(bar_template()));
    assert_eq!(endpoint.role(), Role::Provider);
    assert_eq!(slot_name(endpoint.model(), Slot::LocalApp).as_deref(), Some("ProviderApp"));
}

#[test]
fn both_shorthands_are_rejected() {
    let harness = Arc::new(Harness::new("local", [("foo", Role::Requirer)]));
    let built = Endpoint::builder(harness, "foo")
        .requirer_template(bar_template())
        .provider_template(bar_template())
        .build();
    assert!(matches!(built, Err(reldata::Error::Config(_))));
}

#[test]
fn no_template_means_no_schema_anywhere() {
    let endpoint = endpoint_for(Some(Role::Requirer), |b| b);
    assert_eq!(*endpoint.model(), RelationModel::default());
    let relation = endpoint.relation().expect("relation");
    assert!(relation.local_app_data().schema().is_none());
    assert!(relation.remote_units_data().values().all(|d| d.schema().is_none()));
}

#[test]
fn template_description() {
    let template = bar_template();
    let described = serde_json::to_value(&template).expect("serialize");
    assert_eq!(
        described,
        json!({
            "requirer": {"app": {"foo": "int"}, "unit": {}},
            "provider": {"app": {}, "unit": {"bar": "float"}},
        })
    );

    let half = Template::new(Some(DataBagModel::default().with_unit(Schema::record("U", [Field::required("x", FieldKind::Object)]))), None);
    assert_eq!(
        serde_json::to_value(&half).expect("serialize"),
        json!({"requirer": {"app": null, "unit": {"x": "dict"}}, "provider": null})
    );
}
