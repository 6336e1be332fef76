use chrono::Utc;

use crate::error::{InstallerError, Result};
use crate::models::field::{IMAGE_TAG_KEY, PORT_KEY};
use crate::models::{
    DeploymentMode, InstallContext, PollOutcome, ProgressEvent, ProgressSink, RunReport, Stage,
    DEFAULT_SETTINGS, FIELDS, REGISTRY_CREDENTIALS,
};

use super::config_store::ConfigStore;
use super::driver::DeploymentDriver;
use super::health::HealthProbe;
use super::prompt::{self, PromptCollector, Prompter};

/// Drives one install or upgrade from mode detection to a healthy deployment.
///
/// Nothing is rolled back on failure. Configuration written and images pulled
/// before the failing step stay in place, so re-running picks up where the
/// last run stopped.
pub struct ProvisioningSequencer<'a, D, H> {
    ctx: &'a InstallContext,
    driver: &'a D,
    probe: &'a H,
}

impl<'a, D, H> ProvisioningSequencer<'a, D, H>
where
    D: DeploymentDriver,
    H: HealthProbe,
{
    pub fn new(ctx: &'a InstallContext, driver: &'a D, probe: &'a H) -> Self {
        Self { ctx, driver, probe }
    }

    pub async fn run<P, S>(&self, prompter: &mut P, sink: &mut S) -> Result<RunReport>
    where
        P: Prompter,
        S: ProgressSink,
    {
        self.enter(sink, Stage::Init);
        match self.drive(prompter, sink).await {
            Ok(report) => {
                self.enter(sink, Stage::Success);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "provisioning_failed");
                self.enter(sink, Stage::Failed);
                Err(e)
            }
        }
    }

    async fn drive<P, S>(&self, prompter: &mut P, sink: &mut S) -> Result<RunReport>
    where
        P: Prompter,
        S: ProgressSink,
    {
        let started_at = Utc::now();

        self.enter(sink, Stage::ModeDetect);
        let env_path = self.ctx.env_path();
        let mode = DeploymentMode::detect(&env_path);
        tracing::info!(mode = %mode, path = %env_path.display(), "deployment_mode_detected");
        sink.emit(ProgressEvent::ModeDetected(mode));
        let mut store = ConfigStore::load(&env_path).await?;

        self.enter(sink, Stage::Authenticate);
        let reference = self.ctx.image_reference(store.get(IMAGE_TAG_KEY));
        self.authenticate(&reference, prompter, sink).await?;

        self.enter(sink, Stage::ConfigureEnv);
        let newly_collected = self.configure_env(&mut store, prompter, sink).await?;

        self.enter(sink, Stage::Provisioning);
        let reference = self.ctx.image_reference(store.get(IMAGE_TAG_KEY));
        self.provision(&reference, sink).await?;

        self.enter(sink, Stage::HealthPoll);
        let health_url = self.ctx.health_url(store.get(PORT_KEY));
        match self.poll_readiness(&health_url, sink).await {
            PollOutcome::Ready { attempt } => {
                let app_url = self.ctx.app_url(store.get(PORT_KEY));
                sink.emit(ProgressEvent::Ready {
                    url: app_url.clone(),
                });
                Ok(RunReport {
                    mode,
                    newly_collected,
                    image_reference: reference,
                    app_url,
                    attempts: attempt,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
            PollOutcome::Crashed {
                attempt,
                service,
                status,
            } => {
                let logs = self
                    .driver
                    .recent_logs(&service, self.ctx.settings.log_lines)
                    .await;
                Err(InstallerError::ServiceCrashed {
                    service,
                    status,
                    attempt,
                    logs,
                })
            }
            PollOutcome::TimedOut { attempts } => Err(InstallerError::HealthPollExhausted {
                attempts,
                url: health_url,
            }),
        }
    }

    /// Log in only when the registry rejects the credentials already on the host.
    async fn authenticate<P, S>(&self, reference: &str, prompter: &mut P, sink: &mut S) -> Result<()>
    where
        P: Prompter,
        S: ProgressSink,
    {
        if self.driver.probe_access(reference).await {
            tracing::debug!(reference, "registry_access_ok");
            return Ok(());
        }

        let registry = self.ctx.settings.registry.as_str();
        sink.emit(ProgressEvent::CredentialsRequired {
            registry: registry.to_string(),
        });
        let [username_field, token_field] = &REGISTRY_CREDENTIALS;
        let username = prompt::ask(prompter, username_field).await?;
        let token = prompt::ask(prompter, token_field).await?;
        self.driver.login(registry, &username, &token).await?;
        tracing::info!(registry, "registry_login_succeeded");
        Ok(())
    }

    async fn configure_env<P, S>(
        &self,
        store: &mut ConfigStore,
        prompter: &mut P,
        sink: &mut S,
    ) -> Result<bool>
    where
        P: Prompter,
        S: ProgressSink,
    {
        let collected = PromptCollector::new(FIELDS)
            .collect(store, prompter, sink)
            .await?;

        let mut written = 0;
        for (key, value) in DEFAULT_SETTINGS {
            if store.set_default_if_absent(key, value).await? {
                written += 1;
            }
        }
        tracing::debug!(written, "default_settings_applied");
        sink.emit(ProgressEvent::DefaultsApplied { written });
        Ok(collected)
    }

    async fn provision<S: ProgressSink>(&self, reference: &str, sink: &mut S) -> Result<()> {
        self.driver.prepare().await?;

        sink.emit(ProgressEvent::PullStarted {
            reference: reference.to_string(),
        });
        self.driver.pull(reference).await?;

        sink.emit(ProgressEvent::ServicesStarting);
        self.driver.start().await?;
        Ok(())
    }

    /// Bounded readiness loop. A crashed service ends the loop at once; the
    /// first healthy probe ends it early.
    pub async fn poll_readiness<S: ProgressSink>(&self, url: &str, sink: &mut S) -> PollOutcome {
        let total = self.ctx.settings.poll_attempts;
        for attempt in 1..=total {
            sink.emit(ProgressEvent::PollAttempt { attempt, total });

            for service in &self.ctx.settings.services {
                let status = self.driver.status(service).await;
                if status.is_crashed() {
                    tracing::warn!(attempt, service = %service, status = %status, "service_crashed");
                    return PollOutcome::Crashed {
                        attempt,
                        service: service.clone(),
                        status,
                    };
                }
            }

            if self.probe.check(url).await {
                tracing::info!(attempt, url, "application_ready");
                return PollOutcome::Ready { attempt };
            }
            tracing::debug!(attempt, total, "health_poll_attempt");

            if attempt < total {
                tokio::time::sleep(self.ctx.poll_interval).await;
            }
        }
        tracing::warn!(attempts = total, url, "health_poll_exhausted");
        PollOutcome::TimedOut { attempts: total }
    }

    fn enter<S: ProgressSink>(&self, sink: &mut S, stage: Stage) {
        if stage.is_terminal() {
            tracing::info!(stage = ?stage, "provisioning_finished");
        } else {
            tracing::debug!(stage = ?stage, "stage_entered");
        }
        sink.emit(ProgressEvent::StageEntered(stage));
    }
}
