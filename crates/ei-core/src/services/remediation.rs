use crate::error::InstallerError;
use crate::models::InstallContext;

use super::settings_loader::SETTINGS_FILENAME;

/// What to tell the user after a terminal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remediation {
    pub headline: String,
    /// Supporting output, such as the last log lines of a crashed service.
    pub details: Vec<String>,
    /// Commands or actions to try next, in order.
    pub steps: Vec<String>,
}

pub fn for_error(err: &InstallerError, ctx: &InstallContext) -> Remediation {
    let env_path = ctx.env_path();
    let compose = ctx.compose_command();
    let edit_config = format!("Edit the configuration: ${{EDITOR:-vi}} {}", env_path.display());
    let restart = format!("Restart the services: {compose} up -d");
    let logs_for = |service: &str| format!("View the logs: {compose} logs -f {service}");
    let primary = ctx.settings.primary_service.as_str();

    match err {
        InstallerError::PrerequisiteMissing { what, .. } => Remediation {
            headline: format!("{what} is missing or too old"),
            details: vec![err.to_string()],
            steps: vec![
                "Install Docker Engine 20.10+ with the Compose v2 plugin: https://docs.docker.com/engine/install/".into(),
                "Make sure the Docker daemon is running: docker info".into(),
                "Re-run the installer".into(),
            ],
        },
        InstallerError::StoreUnreadable { path, .. } => Remediation {
            headline: "The configuration file could not be read".into(),
            details: vec![err.to_string()],
            steps: vec![
                format!("Check the file permissions: ls -l {}", path.display()),
                "Fix or move the file aside, then re-run the installer".into(),
            ],
        },
        InstallerError::Settings(_) => Remediation {
            headline: "The installer settings are invalid".into(),
            details: vec![err.to_string()],
            steps: vec![format!(
                "Fix {}, or remove it to use the defaults",
                ctx.install_dir.join(SETTINGS_FILENAME).display()
            )],
        },
        InstallerError::Input(_) => Remediation {
            headline: "Could not read your answers".into(),
            details: vec![err.to_string()],
            steps: vec![
                "Run the installer from an interactive terminal".into(),
                format!(
                    "Answers already given are saved in {}; re-running resumes from there",
                    env_path.display()
                ),
            ],
        },
        InstallerError::AuthenticationFailure(_) => Remediation {
            headline: "Could not log in to the container registry".into(),
            details: vec![err.to_string()],
            steps: vec![
                "Check your registry username and access token".into(),
                format!("Log in manually: docker login {}", ctx.settings.registry),
                "Re-run the installer".into(),
            ],
        },
        InstallerError::ArtifactPullFailure { reference, .. } => Remediation {
            headline: format!("Could not pull {reference}"),
            details: vec![err.to_string()],
            steps: vec![
                format!("Check IMAGE_TAG in {}", env_path.display()),
                format!("Pull manually to see the full error: docker pull {reference}"),
                logs_for(primary),
                "Re-run the installer".into(),
            ],
        },
        InstallerError::ServiceStartFailure(_) => Remediation {
            headline: "The services could not be started".into(),
            details: vec![err.to_string()],
            steps: vec![edit_config, restart, logs_for(primary)],
        },
        InstallerError::ServiceCrashed { service, logs, .. } => Remediation {
            headline: format!("Service '{service}' crashed during startup"),
            details: logs.clone(),
            steps: vec![edit_config, restart, logs_for(service)],
        },
        InstallerError::HealthPollExhausted { url, .. } => Remediation {
            headline: "The application is still starting or not responding".into(),
            details: vec![err.to_string()],
            steps: vec![
                format!("Wait a minute, then check again: curl -f {url}"),
                logs_for(primary),
                restart,
            ],
        },
        InstallerError::Process(_)
        | InstallerError::Io(_)
        | InstallerError::Yaml(_) => Remediation {
            headline: "The installer hit an unexpected error".into(),
            details: vec![err.to_string()],
            steps: vec![logs_for(primary), "Re-run the installer".into()],
        },
    }
}
