use std::path::PathBuf;

use clap::Parser;

/// Install or upgrade the Enterprise server with Docker Compose.
#[derive(Debug, Parser)]
#[command(name = "enterprise-install", version)]
pub struct Args {
    /// Directory holding .env, docker-compose.yml and the optional installer.yaml
    #[arg(long, env = "ENTERPRISE_INSTALL_DIR", default_value = "./enterprise")]
    pub install_dir: PathBuf,

    /// Write debug logs to enterprise-install-debug.log in the current directory
    #[arg(long)]
    pub debug: bool,

    /// Print the saved configuration with secrets masked, then exit
    #[arg(long)]
    pub show_config: bool,
}
