//! `reldata-check`: validate raw databags against a schema.
//!
//! ```text
//! reldata-check scenario.json
//! ```
//!
//! The scenario is a JSON document:
//!
//! ```json
//! {
//!   "schema": { "name": "Db", "fields": [
//!       { "name": "host", "kind": "str" },
//!       { "name": "port", "kind": "int", "default": 5432 } ] },
//!   "databags": { "remote/0": { "host": "\"db.local\"", "port": "5432" } }
//! }
//! ```
//!
//! Exits with 0 when every databag is valid, 1 when some are not, and 2 when
//! the scenario cannot be read.

use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

use reldata::{Error, Field, FieldKind, RawData, Result, Schema, Settings, Validity, settings, worst_case};

#[derive(Debug, Deserialize)]
struct FieldSpec {
    name: String,
    kind: FieldKind,
    #[serde(default)]
    default: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SchemaSpec {
    #[serde(default = "default_schema_name")]
    name: String,
    fields: Vec<FieldSpec>,
}

fn default_schema_name() -> String {
    "Scenario".to_owned()
}

#[derive(Debug, Deserialize)]
struct Scenario {
    schema: SchemaSpec,
    #[serde(default)]
    databags: BTreeMap<String, RawData>,
}

impl From<SchemaSpec> for Schema {
    fn from(spec: SchemaSpec) -> Self {
        let fields = spec.fields.into_iter().map(|f| match f.default {
            Some(default) => Field::optional(f.name, f.kind, default),
            None => Field::required(f.name, f.kind),
        });
        Schema::record(spec.name, fields)
    }
}

fn check(path: &str, settings: &Settings) -> Result<Validity> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::Config(format!("cannot read {path}: {e}")))?;
    let scenario: Scenario = serde_json::from_str(&text)?;
    let schema = Arc::new(Schema::from(scenario.schema));
    let kind = settings.validator_kind();
    info!(schema = %schema, validator = %kind, databags = scenario.databags.len(), "checking scenario");

    let mut outcomes = Vec::with_capacity(scenario.databags.len());
    for (entity, data) in &scenario.databags {
        let validity = kind.build(Some(Arc::clone(&schema))).validate(data, false)?;
        println!("{entity}: {validity}");
        outcomes.push(validity);
    }
    let overall = worst_case(outcomes);
    println!("overall: {overall}");
    Ok(overall)
}

fn main() -> ExitCode {
    let settings = settings::global();
    settings::init_logging(settings);

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: reldata-check <scenario.json>");
        return ExitCode::from(2);
    };
    match check(&path, settings) {
        Ok(Validity::Valid) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            error!(error = %e, "scenario check failed");
            eprintln!("{e}");
            ExitCode::from(2)
        }
    }
}
