use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// The link could not be opened or its charset negotiated.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The engine rejected a rendered statement.
    #[error("Query error: {message} (SQL: {sql})")]
    Query { sql: String, message: String },

    /// An insert or update violated an engine constraint.
    #[error("Constraint violation: {message} (SQL: {sql})")]
    Constraint { sql: String, message: String },

    /// A value failed coercion or a required field was left unset.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Lock unavailable on {table}: {reason}")]
    LockUnavailable { table: String, reason: String },

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    #[error("No attached extension provides '{0}'")]
    UnknownMethod(String),

    #[error("{operation} is not supported by the {driver} driver")]
    Unsupported {
        driver: &'static str,
        operation: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DbError {
    pub(crate) fn query(sql: &str, message: impl Into<String>) -> Self {
        DbError::Query {
            sql: sql.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn constraint(sql: &str, message: impl Into<String>) -> Self {
        DbError::Constraint {
            sql: sql.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
