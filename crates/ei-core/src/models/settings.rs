use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::field::{DEFAULT_PORT, LATEST_TAG};

/// Optional `installer.yaml` overrides. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerSettings {
    pub registry: String,
    pub repository: String,
    pub project: String,
    pub services: Vec<String>,
    pub primary_service: String,
    pub health_path: String,
    pub poll_attempts: u32,
    pub poll_interval_secs: u64,
    pub log_lines: usize,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            registry: "ghcr.io".into(),
            repository: "enterprise/server".into(),
            project: "enterprise".into(),
            services: vec!["web".into(), "worker".into()],
            primary_service: "web".into(),
            health_path: "/up".into(),
            poll_attempts: 30,
            poll_interval_secs: 2,
            log_lines: 50,
        }
    }
}

/// Everything a run needs to know about where and what it installs.
/// Built once at startup and passed by reference to every component.
#[derive(Debug, Clone)]
pub struct InstallContext {
    pub install_dir: PathBuf,
    pub settings: InstallerSettings,
    pub poll_interval: Duration,
}

impl InstallContext {
    pub fn new(install_dir: PathBuf, settings: InstallerSettings) -> Self {
        let poll_interval = Duration::from_secs(settings.poll_interval_secs);
        Self {
            install_dir,
            settings,
            poll_interval,
        }
    }

    pub fn env_path(&self) -> PathBuf {
        self.install_dir.join(".env")
    }

    pub fn compose_path(&self) -> PathBuf {
        self.install_dir.join("docker-compose.yml")
    }

    /// `registry/repository`, without a tag.
    pub fn image_repository(&self) -> String {
        format!("{}/{}", self.settings.registry, self.settings.repository)
    }

    /// Full artifact reference for `tag`, falling back to the floating latest tag.
    pub fn image_reference(&self, tag: Option<&str>) -> String {
        let tag = tag.filter(|t| !t.trim().is_empty()).unwrap_or(LATEST_TAG);
        format!("{}:{}", self.image_repository(), tag.trim())
    }

    /// Local health endpoint for the configured port.
    pub fn health_url(&self, port: Option<&str>) -> String {
        let port = port.filter(|p| !p.trim().is_empty()).unwrap_or(DEFAULT_PORT);
        format!("http://localhost:{}{}", port.trim(), self.settings.health_path)
    }

    /// Base URL the application is served on.
    pub fn app_url(&self, port: Option<&str>) -> String {
        let port = port.filter(|p| !p.trim().is_empty()).unwrap_or(DEFAULT_PORT);
        format!("http://localhost:{}", port.trim())
    }

    /// `docker compose` invocation prefix shown to users in remediation text.
    pub fn compose_command(&self) -> String {
        format!("docker compose -f {}", self.compose_path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> InstallContext {
        InstallContext::new(PathBuf::from("/opt/enterprise"), InstallerSettings::default())
    }

    #[test]
    fn paths_live_in_install_dir() {
        let ctx = ctx();
        assert_eq!(ctx.env_path(), PathBuf::from("/opt/enterprise/.env"));
        assert_eq!(
            ctx.compose_path(),
            PathBuf::from("/opt/enterprise/docker-compose.yml")
        );
        assert_eq!(ctx.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn image_reference_falls_back_to_latest() {
        let ctx = ctx();
        assert_eq!(
            ctx.image_reference(Some("2.4.1")),
            "ghcr.io/enterprise/server:2.4.1"
        );
        assert_eq!(ctx.image_reference(None), "ghcr.io/enterprise/server:latest");
        assert_eq!(
            ctx.image_reference(Some("  ")),
            "ghcr.io/enterprise/server:latest"
        );
    }

    #[test]
    fn health_url_uses_port_or_default() {
        let ctx = ctx();
        assert_eq!(ctx.health_url(Some("8080")), "http://localhost:8080/up");
        assert_eq!(ctx.health_url(None), "http://localhost:3000/up");
        assert_eq!(ctx.app_url(None), "http://localhost:3000");
    }
}
