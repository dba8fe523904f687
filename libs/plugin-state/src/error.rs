//! Error types for plugin-state

use plugin_model::ModelError;
use thiserror::Error;

/// Plugin state result type
pub type Result<T> = std::result::Result<T, PluginError>;

/// Structured error category reported to administrative callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidParameter,
    ApplyFailure,
    SnapshotIntegrityFailure,
    SnapshotIoFailure,
    Persistence,
    ClusterUnavailable,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidParameter => "InvalidParameter",
            ErrorKind::ApplyFailure => "ApplyFailure",
            ErrorKind::SnapshotIntegrityFailure => "SnapshotIntegrityFailure",
            ErrorKind::SnapshotIoFailure => "SnapshotIoFailure",
            ErrorKind::Persistence => "Persistence",
            ErrorKind::ClusterUnavailable => "ClusterUnavailable",
            ErrorKind::Configuration => "Configuration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plugin state error types
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("Required config missing: {key}")]
    MissingRequiredConfig { plugin_id: String, key: String },

    #[error("{message}")]
    ApplyFailure { plugin_id: String, message: String },

    #[error("Snapshot checksum failed: expected {expected}, actual {actual}")]
    SnapshotIntegrity { expected: String, actual: String },

    #[error("Snapshot I/O error: {0}")]
    SnapshotIo(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("{0}")]
    Sync(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PluginError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PluginError::NotFound(_) => ErrorKind::NotFound,
            PluginError::InvalidParameter(_) | PluginError::MissingRequiredConfig { .. } => {
                ErrorKind::InvalidParameter
            },
            PluginError::ApplyFailure { .. } | PluginError::Serialization(_) => {
                ErrorKind::ApplyFailure
            },
            PluginError::SnapshotIntegrity { .. } => ErrorKind::SnapshotIntegrityFailure,
            PluginError::SnapshotIo(_) => ErrorKind::SnapshotIoFailure,
            PluginError::Persistence(_) => ErrorKind::Persistence,
            PluginError::Sync(_) => ErrorKind::ClusterUnavailable,
            PluginError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// HTTP-style status for callers that render errors
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidParameter => 400,
            ErrorKind::ClusterUnavailable => 503,
            _ => 500,
        }
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        PluginError::InvalidParameter(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        PluginError::Persistence(msg.into())
    }

    pub fn sync(msg: impl Into<String>) -> Self {
        PluginError::Sync(msg.into())
    }
}

impl From<ModelError> for PluginError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::EmptyPluginId
            | ModelError::InvalidPluginId(_)
            | ModelError::UnknownCategory(_) => PluginError::InvalidParameter(err.to_string()),
            ModelError::Serialization(msg) => PluginError::Serialization(msg),
            ModelError::MalformedPayload(_)
            | ModelError::UnknownOperation { .. }
            | ModelError::MissingField { .. } => PluginError::ApplyFailure {
                plugin_id: err.plugin_id().unwrap_or_default().to_string(),
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        PluginError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        PluginError::SnapshotIo(err.to_string())
    }
}

impl From<figment::Error> for PluginError {
    fn from(err: figment::Error) -> Self {
        PluginError::Configuration(err.to_string())
    }
}
