
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {data} does not conform to {schema}")]
    Validation { schema: String, data: String },
    #[error("Coercion error: cannot coerce {key}={value:?} to {expected}")]
    Coercion { key: String, value: String, expected: String },
    #[error("Invalid field name: {name} is not declared by {schema}")]
    InvalidFieldName { name: String, schema: String },
    #[error("Invalid pattern: {pattern} for field {field}: {reason}")]
    InvalidPattern { field: String, pattern: String, reason: String },
    #[error("Cannot write: {entity} databag of relation {relation} is read-only")]
    CannotWrite { relation: String, entity: String },
    #[error("Unbound endpoint: {endpoint} has no relation in scope")]
    UnboundEndpoint { endpoint: String },
    #[error("Too many relations: {endpoint} has {count} alive relations, expected one")]
    TooManyRelations { endpoint: String, count: usize },
    #[error("Key not found: {key} in {entity} databag")]
    KeyNotFound { key: String, entity: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this is one of the validation family (plain, coercion or field name).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::Coercion { .. } | Self::InvalidFieldName { .. }
        )
    }
    pub(crate) fn coercion(key: &str, value: impl ToString, expected: impl ToString) -> Self {
        Self::Coercion {
            key: key.to_owned(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// Helper conversions
impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
