use std::io::Write;
use std::path::Path;

use ei_core::models::{
    DeploymentMode, InstallContext, ProgressEvent, ProgressSink, RunReport, Stage,
};
use ei_core::services::remediation::Remediation;

/// Line shown for a progress event, if any.
pub fn describe(event: &ProgressEvent) -> Option<String> {
    let line = match event {
        ProgressEvent::StageEntered(stage) => match stage {
            Stage::Authenticate => "==> Checking registry access".to_string(),
            Stage::ConfigureEnv => "==> Configuring environment".to_string(),
            Stage::Provisioning => "==> Deploying".to_string(),
            Stage::HealthPoll => "==> Waiting for the application to start".to_string(),
            Stage::Init | Stage::ModeDetect | Stage::Success | Stage::Failed => return None,
        },
        ProgressEvent::ModeDetected(DeploymentMode::FreshInstall) => {
            "No existing configuration found, starting a fresh install".to_string()
        }
        ProgressEvent::ModeDetected(DeploymentMode::Upgrade) => {
            "Existing configuration found, upgrading in place".to_string()
        }
        ProgressEvent::CredentialsRequired { registry } => {
            format!("Log in to {registry} to download the application image")
        }
        ProgressEvent::FieldCollected { key } => format!("    saved {key}"),
        ProgressEvent::DefaultsApplied { written: 0 } => return None,
        ProgressEvent::DefaultsApplied { written } => {
            format!("    applied {written} default setting(s)")
        }
        ProgressEvent::PullStarted { reference } => format!("Pulling {reference}"),
        ProgressEvent::ServicesStarting => "Starting services".to_string(),
        ProgressEvent::PollAttempt { attempt, total } => {
            format!("    checking health ({attempt}/{total})")
        }
        ProgressEvent::Ready { url } => format!("Application is up at {url}"),
    };
    Some(line)
}

/// Writes progress lines as they arrive.
pub struct ConsoleReporter<W> {
    out: W,
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ProgressSink for ConsoleReporter<W> {
    fn emit(&mut self, event: ProgressEvent) {
        tracing::debug!(?event, "progress");
        if let Some(line) = describe(&event) {
            let _ = writeln!(self.out, "{line}");
            let _ = self.out.flush();
        }
    }
}

pub fn render_summary(report: &RunReport, ctx: &InstallContext) -> String {
    let compose = ctx.compose_command();
    let headline = match (report.mode, report.newly_collected) {
        (DeploymentMode::FreshInstall, _) => "Installation complete.",
        (DeploymentMode::Upgrade, true) => "Upgrade complete. New settings were saved.",
        (DeploymentMode::Upgrade, false) => "Upgrade complete. Configuration unchanged.",
    };

    let mut out = String::new();
    out.push_str(headline);
    out.push('\n');
    out.push_str(&format!("  URL:           {}\n", report.app_url));
    out.push_str(&format!("  Image:         {}\n", report.image_reference));
    out.push_str(&format!("  Configuration: {}\n", ctx.env_path().display()));
    out.push_str(&format!(
        "  Ready after {} check(s) in {}s\n",
        report.attempts,
        report.elapsed_secs()
    ));
    out.push_str("\nUseful commands:\n");
    out.push_str(&format!("  {compose} logs -f\n"));
    out.push_str(&format!("  {compose} up -d\n"));
    out.push_str(&format!("  {compose} down\n"));
    out
}

pub fn render_failure(remediation: &Remediation) -> String {
    let mut out = format!("Installation failed: {}\n", remediation.headline);
    if !remediation.details.is_empty() {
        out.push('\n');
        for line in &remediation.details {
            out.push_str(&format!("  {line}\n"));
        }
    }
    if !remediation.steps.is_empty() {
        out.push_str("\nNext steps:\n");
        for (i, step) in remediation.steps.iter().enumerate() {
            out.push_str(&format!("  {}. {step}\n", i + 1));
        }
    }
    out
}

/// Stored configuration with secrets masked.
pub fn render_configuration(path: &Path, entries: &[(String, String)]) -> String {
    if entries.is_empty() {
        return format!("No configuration at {}\n", path.display());
    }
    let width = entries.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    let mut out = format!("{}\n", path.display());
    for (key, value) in entries {
        out.push_str(&format!("  {key:<width$} = {value}\n"));
    }
    out
}
