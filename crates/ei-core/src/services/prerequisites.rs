use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tokio::process::Command;

use crate::error::{InstallerError, Result};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").unwrap());

pub const MIN_DOCKER: Version = Version(20, 10, 0);
pub const MIN_COMPOSE: Version = Version(2, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u32, pub u32, pub u32);

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// First `major.minor[.patch]` in `text`.
pub fn parse_version(text: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(text)?;
    let major = caps[1].parse().ok()?;
    let minor = caps[2].parse().ok()?;
    let patch = caps
        .get(3)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);
    Some(Version(major, minor, patch))
}

/// Check that `output` reports at least `minimum`.
pub fn ensure_minimum(what: &str, output: &str, minimum: Version) -> Result<Version> {
    let found = parse_version(output).ok_or_else(|| InstallerError::PrerequisiteMissing {
        what: what.to_string(),
        detail: format!("could not read a version from '{}'", output.trim()),
    })?;
    if found < minimum {
        return Err(InstallerError::PrerequisiteMissing {
            what: what.to_string(),
            detail: format!("version {found} is older than the required {minimum}"),
        });
    }
    Ok(found)
}

async fn run(what: &str, args: &[&str]) -> Result<String> {
    let output = Command::new("docker")
        .args(args)
        .output()
        .await
        .map_err(|e| InstallerError::PrerequisiteMissing {
            what: what.to_string(),
            detail: format!("failed to run docker: {e}"),
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(InstallerError::PrerequisiteMissing {
            what: what.to_string(),
            detail: stderr.trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Docker engine, the compose v2 plugin and a reachable daemon.
pub async fn check() -> Result<()> {
    let docker = run("Docker", &["--version"]).await?;
    let docker_version = ensure_minimum("Docker", &docker, MIN_DOCKER)?;

    let compose = run("Docker Compose", &["compose", "version", "--short"]).await?;
    let compose_version = ensure_minimum("Docker Compose", &compose, MIN_COMPOSE)?;

    run("Docker daemon", &["info", "--format", "{{.ServerVersion}}"]).await?;

    tracing::info!(
        docker = %docker_version,
        compose = %compose_version,
        "prerequisites_satisfied"
    );
    Ok(())
}
