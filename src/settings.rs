//! Process-wide settings: which validator backend endpoints default to, and
//! the log filter used by the checker binary.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `reldata.{toml,json,yaml}` in the working directory (or an explicit path),
//! and `RELDATA_*` environment variables (`RELDATA_VALIDATOR=record`).

use std::path::Path;

use config::{Config, Environment, File};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::validator::ValidatorKind;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pinned backend; detected when absent.
    pub validator: Option<ValidatorKind>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            validator: None,
            log_filter: "info".to_owned(),
        }
    }
}

impl Settings {
    /// Settings from `reldata.*` in the working directory, if any, and the environment.
    pub fn load() -> Result<Self> {
        Self::build(File::with_name("reldata").required(false))
    }

    /// Settings from the file at `path` (which must exist) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(File::from(path.as_ref()).required(true))
    }

    fn build<S>(file: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("RELDATA"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// The configured backend, or the richest one compiled in.
    ///
    /// A configured backend that is not compiled in is kept as is;
    /// [`ValidatorKind::build`] falls back from it.
    pub fn validator_kind(&self) -> ValidatorKind {
        self.validator.unwrap_or_else(ValidatorKind::detect)
    }
}

lazy_static! {
    static ref GLOBAL: Settings = Settings::load().unwrap_or_else(|e| {
        warn!(error = %e, "settings could not be loaded, using defaults");
        Settings::default()
    });
}

/// Settings resolved once for the whole process.
pub fn global() -> &'static Settings {
    &GLOBAL
}

/// Install a `tracing` subscriber; `RUST_LOG` wins over the configured filter.
pub fn init_logging(settings: &Settings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter));
    // a subscriber installed earlier (tests, embedding hosts) is left in place
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
