use tokio::sync::mpsc;

use super::deployment::{DeploymentMode, Stage};

/// Observable steps of a provisioning run. Never carries secret values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StageEntered(Stage),
    ModeDetected(DeploymentMode),
    CredentialsRequired { registry: String },
    FieldCollected { key: String },
    DefaultsApplied { written: usize },
    PullStarted { reference: String },
    ServicesStarting,
    PollAttempt { attempt: u32, total: u32 },
    Ready { url: String },
}

/// Receiver of progress events, called in order on the sequencer's task.
pub trait ProgressSink {
    fn emit(&mut self, event: ProgressEvent);
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        let _ = self.send(event);
    }
}
