// Each test binary compiles this module independently and uses a different
// subset of helpers, so unused-function warnings are expected.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use ei_core::models::{DeploymentMode, InstallContext, InstallerSettings, RunReport};

/// Context rooted at a fixed path so rendered commands are stable.
pub fn make_ctx() -> InstallContext {
    InstallContext::new("/opt/enterprise".into(), InstallerSettings::default())
}

pub fn started_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap()
}

/// Successful run report that took 42 seconds and `attempts` health checks.
pub fn make_report(mode: DeploymentMode, newly_collected: bool, attempts: u32) -> RunReport {
    RunReport {
        mode,
        newly_collected,
        image_reference: "ghcr.io/enterprise/server:latest".into(),
        app_url: "http://localhost:3000".into(),
        attempts,
        started_at: started_at(),
        finished_at: started_at() + chrono::Duration::seconds(42),
    }
}
