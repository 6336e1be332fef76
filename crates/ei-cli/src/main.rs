use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use ei_cli::cli::Args;
use ei_cli::console::{render_configuration, render_failure, render_summary, ConsoleReporter};
use ei_cli::terminal::TerminalPrompter;
use ei_core::models::{InstallContext, InstallerSettings, RunReport};
use ei_core::services::compose::ComposeDriver;
use ei_core::services::config_store::ConfigStore;
use ei_core::services::health::HttpProbe;
use ei_core::services::sequencer::ProvisioningSequencer;
use ei_core::services::{prerequisites, remediation, settings_loader};
use ei_core::InstallerError;

const DEBUG_LOG: &str = "enterprise-install-debug.log";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let args = Args::parse();

    let _guard = if args.debug {
        Some(setup_debug_logging())
    } else {
        setup_stderr_logging();
        None
    };

    let install_dir = std::path::absolute(&args.install_dir)?;
    let ctx = match settings_loader::load(&install_dir) {
        Ok(settings) => InstallContext::new(install_dir, settings),
        Err(e) => {
            let fallback = InstallContext::new(install_dir, InstallerSettings::default());
            return Ok(fail(&e, &fallback));
        }
    };
    tracing::info!(install_dir = %ctx.install_dir.display(), "installer_started");

    if args.show_config {
        return match ConfigStore::load(&ctx.env_path()).await {
            Ok(store) => {
                print!(
                    "{}",
                    render_configuration(store.path(), &store.redacted_entries())
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => Ok(fail(&e, &ctx)),
        };
    }

    match install(&ctx).await {
        Ok(report) => {
            println!();
            print!("{}", render_summary(&report, &ctx));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Ok(fail(&e, &ctx)),
    }
}

async fn install(ctx: &InstallContext) -> ei_core::Result<RunReport> {
    prerequisites::check().await?;

    let mut prompter = TerminalPrompter::open()?;
    let driver = ComposeDriver::new(ctx);
    let probe = HttpProbe::new(PROBE_TIMEOUT)?;
    let mut reporter = ConsoleReporter::new(io::stdout());

    ProvisioningSequencer::new(ctx, &driver, &probe)
        .run(&mut prompter, &mut reporter)
        .await
}

fn fail(err: &InstallerError, ctx: &InstallContext) -> ExitCode {
    tracing::error!(error = %err, transient = err.is_transient(), "installer_failed");
    eprintln!();
    eprint!("{}", render_failure(&remediation::for_error(err, ctx)));
    ExitCode::from(err.exit_code())
}

/// File-based tracing to `enterprise-install-debug.log` in CWD.
/// Returns the guard that must be held alive for the duration of the program.
fn setup_debug_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(".", DEBUG_LOG);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .init();

    guard
}

/// Without `--debug` only what `RUST_LOG` asks for reaches stderr.
fn setup_stderr_logging() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
        )
        .with_target(false)
        .init();
}
