use std::collections::BTreeMap;
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::{InstallerError, Result};
use crate::models::{InstallContext, ServiceStatus};

use super::driver::DeploymentDriver;

const DESCRIPTOR_TEMPLATE: &str = include_str!("../../templates/docker-compose.yml");
const IMAGE_PLACEHOLDER: &str = "{{image_repository}}";

/// Run `docker` to completion. `Err` carries stderr (or the spawn error) verbatim.
async fn run_docker(args: &[&str], stdin: Option<&str>) -> std::result::Result<String, String> {
    let mut cmd = Command::new("docker");
    cmd.args(args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("failed to run docker: {e}"))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())
            .await
            .map_err(|e| format!("failed to write to docker: {e}"))?;
        drop(pipe);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| format!("failed to wait for docker: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "docker {} failed (exit {}): {}",
            args.first().copied().unwrap_or_default(),
            output.status.code().unwrap_or(-1),
            stderr.trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Docker Compose v2 implementation of [`DeploymentDriver`].
pub struct ComposeDriver {
    compose_file: String,
    project_dir: String,
    project: String,
    image_repository: String,
}

impl ComposeDriver {
    pub fn new(ctx: &InstallContext) -> Self {
        Self {
            compose_file: ctx.compose_path().to_string_lossy().to_string(),
            project_dir: ctx.install_dir.to_string_lossy().to_string(),
            project: ctx.settings.project.clone(),
            image_repository: ctx.image_repository(),
        }
    }

    fn compose_args<'a>(&'a self, extra: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec![
            "compose",
            "-f",
            self.compose_file.as_str(),
            "--project-directory",
            self.project_dir.as_str(),
            "-p",
            self.project.as_str(),
        ];
        args.extend_from_slice(extra);
        args
    }
}

impl DeploymentDriver for ComposeDriver {
    async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.project_dir).await?;
        let descriptor = render_descriptor(&self.image_repository);
        tokio::fs::write(&self.compose_file, descriptor).await?;
        tracing::debug!(path = %self.compose_file, "compose_descriptor_written");
        Ok(())
    }

    async fn probe_access(&self, reference: &str) -> bool {
        match run_docker(&["manifest", "inspect", reference], None).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(reference, error = %e, "registry_probe_failed");
                false
            }
        }
    }

    async fn login(&self, registry: &str, username: &str, token: &str) -> Result<()> {
        run_docker(
            &["login", registry, "--username", username, "--password-stdin"],
            Some(token),
        )
        .await
        .map_err(InstallerError::AuthenticationFailure)?;
        Ok(())
    }

    async fn pull(&self, reference: &str) -> Result<()> {
        run_docker(&["pull", reference], None)
            .await
            .map_err(|detail| InstallerError::ArtifactPullFailure {
                reference: reference.to_string(),
                detail,
            })?;
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        let args = self.compose_args(&["up", "-d", "--remove-orphans"]);
        run_docker(&args, None)
            .await
            .map_err(InstallerError::ServiceStartFailure)?;
        Ok(())
    }

    async fn status(&self, service: &str) -> ServiceStatus {
        let args = self.compose_args(&["ps", "--all", "--format", "json", service]);
        match run_docker(&args, None).await {
            Ok(output) => parse_ps_status(&output),
            Err(e) => {
                tracing::debug!(service, error = %e, "service_status_failed");
                ServiceStatus::Unknown
            }
        }
    }

    async fn recent_logs(&self, service: &str, line_count: usize) -> Vec<String> {
        let tail = line_count.to_string();
        let args = self.compose_args(&["logs", "--no-color", "--tail", &tail, service]);
        match run_docker(&args, None).await {
            Ok(output) => tail_lines(&output, line_count),
            Err(e) => {
                tracing::debug!(service, error = %e, "service_logs_failed");
                Vec::new()
            }
        }
    }
}

/// The compose file with the image repository filled in. The tag stays a
/// compose variable so it follows `IMAGE_TAG` in `.env`.
pub fn render_descriptor(image_repository: &str) -> String {
    DESCRIPTOR_TEMPLATE.replace(IMAGE_PLACEHOLDER, image_repository)
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    services: BTreeMap<String, serde_yaml::Value>,
}

/// Service names the compose descriptor declares.
pub fn declared_services() -> Result<Vec<String>> {
    let descriptor: Descriptor = serde_yaml::from_str(&render_descriptor("registry/repository"))?;
    Ok(descriptor.services.into_keys().collect())
}

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "State", default)]
    state: String,
}

/// Parse `docker compose ps --format json`, which is either one JSON object
/// per line or a single array depending on the compose version.
pub fn parse_ps_status(output: &str) -> ServiceStatus {
    let trimmed = output.trim();
    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).unwrap_or_default()
    } else {
        trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    };

    let statuses: Vec<ServiceStatus> = entries
        .iter()
        .map(|e| ServiceStatus::from_state(&e.state))
        .collect();
    if statuses.contains(&ServiceStatus::Running) {
        return ServiceStatus::Running;
    }
    statuses.first().copied().unwrap_or(ServiceStatus::Unknown)
}

/// Last `line_count` non-empty lines of `content`.
pub fn tail_lines(content: &str, line_count: usize) -> Vec<String> {
    let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(line_count);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InstallerSettings;

    #[test]
    fn descriptor_names_image_and_env_file() {
        let descriptor = render_descriptor("registry.internal/acme/server");
        assert!(descriptor.contains("image: registry.internal/acme/server:${IMAGE_TAG:-latest}"));
        assert!(descriptor.contains("env_file: .env"));
        assert!(descriptor.contains("  web:"));
        assert!(descriptor.contains("  worker:"));
        assert!(!descriptor.contains(IMAGE_PLACEHOLDER));
    }

    #[test]
    fn parse_ndjson_ps_output() {
        let output = r#"{"Name":"enterprise-web-1","Service":"web","State":"running"}"#;
        assert_eq!(parse_ps_status(output), ServiceStatus::Running);

        let exited = r#"{"Name":"enterprise-web-1","Service":"web","State":"exited","ExitCode":1}"#;
        assert_eq!(parse_ps_status(exited), ServiceStatus::Exited);
    }

    #[test]
    fn parse_array_ps_output() {
        let output = r#"[{"Service":"web","State":"dead"}]"#;
        assert_eq!(parse_ps_status(output), ServiceStatus::Dead);
    }

    #[test]
    fn any_running_replica_counts_as_running() {
        let output = "{\"State\":\"exited\"}\n{\"State\":\"running\"}\n";
        assert_eq!(parse_ps_status(output), ServiceStatus::Running);
    }

    #[test]
    fn descriptor_declares_web_and_worker() {
        assert_eq!(declared_services().unwrap(), vec!["web", "worker"]);
    }

    #[test]
    fn descriptor_leaves_crashed_containers_stopped() {
        let descriptor = render_descriptor("ghcr.io/enterprise/server");
        assert!(!descriptor.contains("restart:"));
    }

    #[test]
    fn restarting_container_reads_as_crashed() {
        let output = r#"{"Name":"enterprise-web-1","Service":"web","State":"restarting","ExitCode":1}"#;
        let status = parse_ps_status(output);
        assert_eq!(status, ServiceStatus::Restarting);
        assert!(status.is_crashed());
    }

    #[test]
    fn parse_empty_or_garbage_is_unknown() {
        assert_eq!(parse_ps_status(""), ServiceStatus::Unknown);
        assert_eq!(parse_ps_status("no such service"), ServiceStatus::Unknown);
        assert_eq!(parse_ps_status("[]"), ServiceStatus::Unknown);
    }

    #[test]
    fn tail_lines_keeps_the_end() {
        let content = "one\ntwo\n\nthree\nfour\n";
        assert_eq!(tail_lines(content, 2), vec!["three", "four"]);
        assert_eq!(tail_lines(content, 10).len(), 4);
        assert!(tail_lines("", 5).is_empty());
    }

    #[test]
    fn compose_args_target_the_install_dir() {
        let ctx = InstallContext::new("/opt/enterprise".into(), InstallerSettings::default());
        let driver = ComposeDriver::new(&ctx);
        let args = driver.compose_args(&["up", "-d"]);
        assert_eq!(
            args,
            vec![
                "compose",
                "-f",
                "/opt/enterprise/docker-compose.yml",
                "--project-directory",
                "/opt/enterprise",
                "-p",
                "enterprise",
                "up",
                "-d",
            ]
        );
    }

    #[tokio::test]
    async fn prepare_writes_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let install_dir = dir.path().join("enterprise");
        let ctx = InstallContext::new(install_dir.clone(), InstallerSettings::default());
        let driver = ComposeDriver::new(&ctx);
        driver.prepare().await.unwrap();

        let written = tokio::fs::read_to_string(install_dir.join("docker-compose.yml"))
            .await
            .unwrap();
        assert!(written.contains("image: ghcr.io/enterprise/server:${IMAGE_TAG:-latest}"));
    }
}
