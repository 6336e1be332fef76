pub mod deployment;
pub mod field;
pub mod progress;
pub mod settings;

pub use deployment::{DeploymentMode, PollOutcome, RunReport, ServiceStatus, Stage};
pub use field::{FieldSpec, DEFAULT_SETTINGS, FIELDS, REGISTRY_CREDENTIALS};
pub use progress::{ProgressEvent, ProgressSink};
pub use settings::{InstallContext, InstallerSettings};
