use std::sync::Arc;

use serde_json::json;

use reldata::validator::RecordValidator;
use reldata::{Field, FieldKind, RawData, Schema, Validator, ValidatorKind, Validity};

fn raw<const N: usize>(entries: [(&str, &str); N]) -> RawData {
    entries.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect()
}

fn service() -> Arc<Schema> {
    Arc::new(Schema::record(
        "Service",
        [
            Field::required("host", FieldKind::String),
            Field::required("port", FieldKind::Integer),
            Field::optional("tls", FieldKind::Boolean, false),
            Field::optional("tags", FieldKind::List, json!([])),
        ],
    ))
}

#[test]
fn record_backend_is_strict_on_write() {
    let validator = RecordValidator::new(Some(service()));
    assert_eq!(validator.serialize("port", &json!(5432)).expect("int"), "5432");
    assert_eq!(validator.serialize("host", &json!("db")).expect("str"), r#""db""#);
    assert!(validator.serialize("port", &json!("5432")).is_err());
    assert!(validator.serialize("port", &json!(1.5)).is_err());
    assert!(validator.serialize("tls", &json!("yes")).is_err());
    assert!(matches!(
        validator.serialize("nope", &json!(1)),
        Err(reldata::Error::InvalidFieldName { .. })
    ));
}

#[test]
fn record_backend_reads_unquoted_strings() {
    let validator = RecordValidator::new(Some(service()));
    assert_eq!(validator.deserialize("host", r#""db""#).expect("quoted"), "db");
    assert_eq!(validator.deserialize("host", "db").expect("bare"), "db");
    assert_eq!(validator.deserialize("port", " 5432 ").expect("int"), 5432);
    assert!(validator.deserialize("port", "5432.5").is_err());
    assert_eq!(validator.deserialize("tags", r#"["a"]"#).expect("list"), json!(["a"]));
    assert!(validator.deserialize("tags", r#"{"a": 1}"#).is_err());
}

#[test]
fn large_unsigned_integers_read_back() {
    for kind in [ValidatorKind::Record, ValidatorKind::Model] {
        let validator = kind.build(Some(service()));
        let encoded = validator.serialize("port", &json!(u64::MAX)).expect("u64");
        assert_eq!(encoded, "18446744073709551615");
        assert_eq!(validator.deserialize("port", &encoded).expect("reads back"), json!(u64::MAX));
        assert_eq!(
            validator.validate(&raw([("host", "db"), ("port", encoded.as_str())]), false).expect("valid"),
            Validity::Valid
        );
    }
}

#[test]
fn unquoted_strings_read_as_text() {
    for kind in [ValidatorKind::Record, ValidatorKind::Model] {
        let validator = kind.build(Some(service()));
        for text in ["true", "null", "[1]", "db"] {
            assert_eq!(validator.deserialize("host", text).expect("text"), json!(text));
        }
        assert_eq!(validator.deserialize("host", r#""quoted""#).expect("literal"), "quoted");
    }
}

#[test]
fn bad_patterns_are_rejected_when_declared() {
    let declared = Field::required("name", FieldKind::String).with_pattern("(");
    assert!(matches!(declared, Err(reldata::Error::InvalidPattern { .. })));
    let field = Field::required("name", FieldKind::String).with_pattern("^[a-z]+$").expect("pattern");
    assert_eq!(field.constraints().pattern.as_ref().map(|p| p.as_str()), Some("^[a-z]+$"));
}

#[test]
fn check_field_without_schema_accepts_anything() {
    let validator = RecordValidator::new(None);
    assert!(validator.check_field("whatever").expect("no schema").is_none());
    let bound = RecordValidator::new(Some(service()));
    assert_eq!(bound.check_field("port").expect("declared").map(Field::kind), Some(FieldKind::Integer));
}

#[test]
fn missing_wins_over_invalid() {
    for kind in [ValidatorKind::Record, ValidatorKind::Model] {
        let validator = kind.build(Some(service()));
        assert_eq!(validator.validate(&raw([]), false).expect("empty"), Validity::Incomplete);
        assert_eq!(
            validator.validate(&raw([("host", "\"db\""), ("port", "5432")]), false).expect("good"),
            Validity::Valid
        );
        assert_eq!(
            validator.validate(&raw([("host", "\"db\""), ("port", "x")]), false).expect("bad"),
            Validity::Invalid
        );
        // port missing and tls bad: incomplete, and never an error
        assert_eq!(
            validator.validate(&raw([("host", "\"db\""), ("tls", "maybe")]), true).expect("missing"),
            Validity::Incomplete
        );
        // a tombstone does not satisfy a required field
        assert_eq!(
            validator.validate(&raw([("host", "\"db\""), ("port", "")]), false).expect("tombstone"),
            Validity::Incomplete
        );
    }
}

#[test]
fn unknown_keys_make_data_invalid() {
    let validator = ValidatorKind::Record.build(Some(service()));
    let data = raw([("host", "db"), ("port", "1"), ("extra", "1")]);
    assert_eq!(validator.validate(&data, false).expect("extra"), Validity::Invalid);
    assert!(validator.validate(&data, true).is_err());
}

#[test]
fn rebinding_changes_the_schema() {
    let mut validator = ValidatorKind::Record.build(None);
    assert!(validator.schema().is_none());
    validator.bind(Some(service()));
    assert_eq!(validator.schema().map(|s| s.name().to_owned()).as_deref(), Some("Service"));
    assert_eq!(validator.kind(), ValidatorKind::Record);
}

#[test]
fn detection_picks_the_richest_backend() {
    let detected = ValidatorKind::detect();
    assert!(detected.available());
    if cfg!(feature = "model-validator") {
        assert_eq!(detected, ValidatorKind::Model);
    } else {
        assert_eq!(detected, ValidatorKind::Record);
        // asking for the missing backend still yields a working validator
        assert_eq!(ValidatorKind::Model.build(None).kind(), ValidatorKind::Record);
    }
}

#[cfg(feature = "model-validator")]
mod model {
    use serde::Deserialize;
    use serde_json::Value;

    use super::*;
    use reldata::model::ModelValidator;

    fn constrained() -> Arc<Schema> {
        Arc::new(Schema::model(
            "Constrained",
            [
                Field::required("name", FieldKind::String)
                    .with_pattern("^[a-z]+$")
                    .expect("pattern"),
                Field::optional("replicas", FieldKind::Integer, 1).with_range(Some(1.0), Some(5.0)),
                Field::optional("mode", FieldKind::String, "ro").with_choices(["ro", "rw"]),
            ],
        ))
    }

    #[test]
    fn coerces_on_write_and_stores_the_coerced_value() {
        let validator = ModelValidator::new(Some(service()));
        assert_eq!(validator.serialize("port", &json!("5432")).expect("numeric string"), "5432");
        assert_eq!(validator.serialize("port", &json!(5432.0)).expect("integral"), "5432");
        assert_eq!(validator.serialize("host", &json!(10)).expect("number"), r#""10""#);
        assert_eq!(validator.serialize("tls", &json!("yes")).expect("bool"), "true");
        assert!(validator.serialize("port", &json!("x")).is_err());
        assert!(validator.serialize("port", &json!(1.5)).is_err());
    }

    #[test]
    fn enforces_constraints() {
        let validator = ModelValidator::new(Some(constrained()));
        assert!(validator.serialize("name", &json!("db")).is_ok());
        assert!(validator.serialize("name", &json!("DB")).is_err());
        assert!(validator.serialize("replicas", &json!(3)).is_ok());
        assert!(validator.serialize("replicas", &json!(9)).is_err());
        assert!(validator.serialize("replicas", &json!(0)).is_err());
        assert!(validator.serialize("mode", &json!("rw")).is_ok());
        assert!(validator.serialize("mode", &json!("wo")).is_err());
        assert_eq!(
            validator.validate(&raw([("name", "\"db\""), ("replicas", "7")]), false).expect("range"),
            Validity::Invalid
        );
    }

    #[derive(Deserialize)]
    #[allow(dead_code)]
    struct Window {
        low: i64,
        high: i64,
    }

    #[test]
    fn typed_record_check() {
        let schema = Arc::new(Schema::from(
            reldata::ModelSchema::new(
                "Window",
                [
                    Field::required("low", FieldKind::Integer),
                    Field::optional("high", FieldKind::Any, 10),
                ],
            )
            .typed::<Window>(),
        ));
        let validator = ModelValidator::new(Some(schema));
        // the default fills in for the absent field
        assert_eq!(validator.validate(&raw([("low", "1")]), false).expect("low"), Validity::Valid);
        assert_eq!(
            validator.validate(&raw([("low", "1"), ("high", "\"x\"")]), false).expect("high"),
            Validity::Invalid
        );
    }

    #[test]
    fn nothing_there_is_incomplete() {
        let validator = ModelValidator::new(Some(constrained()));
        assert_eq!(validator.validate(&raw([]), true).expect("empty"), Validity::Incomplete);
        assert_eq!(validator.deserialize("name", "db").expect("bare string"), Value::from("db"));
    }
}
