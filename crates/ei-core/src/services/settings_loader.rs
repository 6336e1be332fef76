use std::path::Path;

use crate::error::{InstallerError, Result};
use crate::models::InstallerSettings;

use super::compose;

pub const SETTINGS_FILENAME: &str = "installer.yaml";

/// Load `installer.yaml` from the install directory, or defaults when absent.
pub fn load(install_dir: &Path) -> Result<InstallerSettings> {
    let settings_path = install_dir.join(SETTINGS_FILENAME);
    if !settings_path.exists() {
        return Ok(InstallerSettings::default());
    }
    let contents = std::fs::read_to_string(&settings_path)?;
    let settings: InstallerSettings = if contents.trim().is_empty() {
        InstallerSettings::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| InstallerError::Settings(e.to_string()))?
    };
    validate(&settings)?;
    tracing::debug!(path = %settings_path.display(), "installer_settings_loaded");
    Ok(settings)
}

fn validate(settings: &InstallerSettings) -> Result<()> {
    if settings.registry.trim().is_empty() || settings.repository.trim().is_empty() {
        return Err(InstallerError::Settings(
            "registry and repository are required".into(),
        ));
    }
    if settings.services.is_empty() {
        return Err(InstallerError::Settings(
            "at least one service is required".into(),
        ));
    }
    let declared = compose::declared_services()?;
    if let Some(unknown) = settings.services.iter().find(|s| !declared.contains(s)) {
        return Err(InstallerError::Settings(format!(
            "service '{unknown}' is not declared in the compose file (known: {})",
            declared.join(", ")
        )));
    }
    if !settings.services.contains(&settings.primary_service) {
        return Err(InstallerError::Settings(format!(
            "primary_service '{}' is not listed in services",
            settings.primary_service
        )));
    }
    if settings.poll_attempts == 0 {
        return Err(InstallerError::Settings(
            "poll_attempts must be at least 1".into(),
        ));
    }
    if !settings.health_path.starts_with('/') {
        return Err(InstallerError::Settings(format!(
            "health_path '{}' must start with '/'",
            settings.health_path
        )));
    }
    Ok(())
}
