use std::path::PathBuf;

use crate::models::ServiceStatus;

#[derive(Debug, thiserror::Error)]
pub enum InstallerError {
    #[error("{what} is not available: {detail}")]
    PrerequisiteMissing { what: String, detail: String },

    #[error("configuration file {path} could not be read: {reason}")]
    StoreUnreadable { path: PathBuf, reason: String },

    #[error("installer settings are invalid: {0}")]
    Settings(String),

    #[error("could not read input: {0}")]
    Input(String),

    #[error("registry authentication failed: {0}")]
    AuthenticationFailure(String),

    #[error("pulling {reference} failed: {detail}")]
    ArtifactPullFailure { reference: String, detail: String },

    #[error("starting services failed: {0}")]
    ServiceStartFailure(String),

    #[error("service '{service}' is {status} (detected on attempt {attempt})")]
    ServiceCrashed {
        service: String,
        status: ServiceStatus,
        attempt: u32,
        logs: Vec<String>,
    },

    #[error("{url} did not respond after {attempts} attempts")]
    HealthPollExhausted { attempts: u32, url: String },

    #[error("process failed: {0}")]
    Process(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl InstallerError {
    /// Process exit status for this failure. Every terminal failure shares `1`;
    /// callers that need to tell a slow start from a crash match on the variant.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// True when waiting longer may resolve the failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, InstallerError::HealthPollExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, InstallerError>;
