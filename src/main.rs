//! droidpack command line entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use droidpack::commands::{BuildCommand, ManifestCommand, RunCommand};
use droidpack::core::{UserConfig, APP_NAME, VERSION};
use droidpack::project::ProjectConfig;

/// Package native Android libraries into a signed APK without Gradle
#[derive(Parser, Debug)]
#[command(name = "droidpack", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging, including every tool command line
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a signed APK
    Build(BuildCommand),
    /// Build, install and launch on a device, then follow its log
    Run(RunCommand),
    /// Print the resolved project manifest as JSON
    Manifest(ManifestCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("{} v{}", APP_NAME, VERSION);

    let user = UserConfig::load()
        .await
        .context("Failed to load user configuration")?;
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let project = ProjectConfig::discover(&cwd)?;

    match cli.command {
        Commands::Build(cmd) => {
            cmd.execute(&project, &user).await?;
        }
        Commands::Run(cmd) => cmd.execute(&project, &user).await?,
        Commands::Manifest(cmd) => cmd.execute(&project).await?,
    }

    Ok(())
}
