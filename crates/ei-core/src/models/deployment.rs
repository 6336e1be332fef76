use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DeploymentMode {
    FreshInstall,
    Upgrade,
}

impl DeploymentMode {
    /// Upgrade iff a persisted configuration file already exists.
    pub fn detect(env_path: &Path) -> Self {
        if env_path.is_file() {
            DeploymentMode::Upgrade
        } else {
            DeploymentMode::FreshInstall
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::FreshInstall => write!(f, "fresh install"),
            DeploymentMode::Upgrade => write!(f, "upgrade"),
        }
    }
}

/// Point-in-time state of one compose service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ServiceStatus {
    Running,
    Restarting,
    Exited,
    Dead,
    Unknown,
}

impl ServiceStatus {
    /// Map a container runtime state string onto the statuses the poll cares about.
    pub fn from_state(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "running" => ServiceStatus::Running,
            "restarting" => ServiceStatus::Restarting,
            "exited" => ServiceStatus::Exited,
            "dead" => ServiceStatus::Dead,
            _ => ServiceStatus::Unknown,
        }
    }

    /// A crashed service will not recover by waiting. A container the runtime
    /// is restarting has already exited once since `up`.
    pub fn is_crashed(self) -> bool {
        matches!(
            self,
            ServiceStatus::Restarting | ServiceStatus::Exited | ServiceStatus::Dead
        )
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Restarting => "restarting",
            ServiceStatus::Exited => "exited",
            ServiceStatus::Dead => "dead",
            ServiceStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Sequencer states, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ModeDetect,
    Authenticate,
    ConfigureEnv,
    Provisioning,
    HealthPoll,
    Success,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Success | Stage::Failed)
    }
}

/// How the readiness poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready {
        attempt: u32,
    },
    Crashed {
        attempt: u32,
        service: String,
        status: ServiceStatus,
    },
    TimedOut {
        attempts: u32,
    },
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub mode: DeploymentMode,
    pub newly_collected: bool,
    pub image_reference: String,
    pub app_url: String,
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub fn elapsed_secs(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}
