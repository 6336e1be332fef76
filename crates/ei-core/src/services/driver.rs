use crate::error::Result;
use crate::models::ServiceStatus;

/// What the sequencer needs from a container runtime.
///
/// `pull` and `start` failures are terminal for the run. `status` and
/// `recent_logs` are diagnostic and never fail; they degrade to
/// [`ServiceStatus::Unknown`] and an empty list.
#[allow(async_fn_in_trait)]
pub trait DeploymentDriver {
    /// Materialize the deployment descriptor next to the configuration file.
    async fn prepare(&self) -> Result<()>;

    /// Cheap check that the current registry credentials can read `reference`.
    async fn probe_access(&self, reference: &str) -> bool;

    async fn login(&self, registry: &str, username: &str, token: &str) -> Result<()>;

    async fn pull(&self, reference: &str) -> Result<()>;

    /// Bring up every declared service in the background.
    async fn start(&self) -> Result<()>;

    async fn status(&self, service: &str) -> ServiceStatus;

    async fn recent_logs(&self, service: &str, line_count: usize) -> Vec<String>;
}
