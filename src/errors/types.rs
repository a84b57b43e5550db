//! # Error Types
//!
//! Error types for the gateway admin core using `thiserror`.
//!
//! Rule-lifecycle failures are first-class variants so the transport layer can
//! distinguish them without string matching. Every variant carries the name or
//! id that caused it.

use std::fmt;

/// Custom result type for gateway admin operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the gateway admin core
#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    /// A route rule with the same name already exists
    #[error("Route rule name '{name}' is already in use")]
    DuplicateName { name: String },

    /// Non-default match object without a complete key/method/rule triple
    #[error("Route rule '{name}' is missing match fields: {missing}")]
    MissingMatchFields { name: String, missing: MissingFields },

    /// Match rule is not usable with the selected match method
    #[error("Route rule '{name}' has an invalid match rule: {message}")]
    InvalidMatchRule { name: String, message: String },

    /// No application instance exists for the declared application and version
    #[error("No instance with version '{version}' exists for application {application_id}")]
    VersionNotFound { application_id: i64, version: String },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Malformed or missing request parameter
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String, field: Option<String> },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// The subset of match fields that were absent on a keyed match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MissingFields {
    pub key: bool,
    pub method: bool,
    pub rule: bool,
}

impl MissingFields {
    pub fn any(&self) -> bool {
        self.key || self.method || self.rule
    }
}

impl fmt::Display for MissingFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            (self.key, "match_key"),
            (self.method, "match_method"),
            (self.rule, "match_rule"),
        ];
        let names: Vec<&str> = fields
            .into_iter()
            .filter_map(|(missing, name)| missing.then_some(name))
            .collect();
        write!(f, "{}", names.join(", "))
    }
}

impl GatewayError {
    /// Create a duplicate rule name error
    pub fn duplicate_name<S: Into<String>>(name: S) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    /// Create a version-not-found error
    pub fn version_not_found<S: Into<String>>(application_id: i64, version: S) -> Self {
        Self::VersionNotFound { application_id, version: version.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: ToString>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.to_string() }
    }

    /// Create a parameter error
    pub fn invalid_parameter<S: Into<String>>(message: S) -> Self {
        Self::InvalidParameter { message: message.into(), field: None }
    }

    /// Create a parameter error with field information
    pub fn invalid_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::InvalidParameter { message: message.into(), field: Some(field.into()) }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Wrap a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether this error was raised by rule validation, before any write
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GatewayError::DuplicateName { .. }
                | GatewayError::MissingMatchFields { .. }
                | GatewayError::InvalidMatchRule { .. }
                | GatewayError::VersionNotFound { .. }
                | GatewayError::InvalidParameter { .. }
        )
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::DuplicateName { .. } => 409,
            GatewayError::MissingMatchFields { .. } => 400,
            GatewayError::InvalidMatchRule { .. } => 400,
            GatewayError::VersionNotFound { .. } => 400,
            GatewayError::NotFound { .. } => 404,
            GatewayError::InvalidParameter { .. } => 400,
            GatewayError::Config { .. } => 500,
            GatewayError::Database { .. } => 500,
            GatewayError::Io { .. } => 500,
            GatewayError::Serialization { .. } => 400,
            GatewayError::Internal { .. } => 500,
        }
    }

    /// Check if this error should be retried by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Database { .. } | GatewayError::Io { .. })
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<sqlx::migrate::MigrateError> for GatewayError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        Self::Database {
            source: sqlx::Error::Migrate(Box::new(error)),
            context: "Database migration failed".to_string(),
        }
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<config::ConfigError> for GatewayError {
    fn from(error: config::ConfigError) -> Self {
        Self::config_with_source("Configuration loading failed", Box::new(error))
    }
}

impl From<validator::ValidationErrors> for GatewayError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let first_field = field_errors.keys().next().map(|field| field.to_string());
        let message = field_errors
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::InvalidParameter {
            message: format!("Validation failed: {}", message),
            field: first_field,
        }
    }
}
