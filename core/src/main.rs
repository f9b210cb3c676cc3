use std::sync::Arc;

use anyhow::{Context, Result};

use deskfleet::{
    cli::config_path_from_args,
    config::Config,
    directory::{DirectoryPort, GraphDirectory},
    fleet::Fleet,
    logging::init_tracing,
    server,
    tools::build_registry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging = init_tracing(&config.logging).context("failed to initialize logging")?;
    tracing::info!(
        target: "server",
        run_id = logging.run_id(),
        config = %config_path.display(),
        log_dir = %logging.log_dir().display(),
        "deskfleet_starting"
    );

    let directory: Arc<dyn DirectoryPort> = Arc::new(
        GraphDirectory::from_config(&config.graph)
            .context("failed to construct graph directory client")?,
    );
    let fleet = Arc::new(Fleet::from_config(&config, directory));
    let registry = Arc::new(build_registry(fleet).context("failed to build tool registry")?);

    let exit_reason = server::run(registry).await?;
    tracing::info!(target: "server", reason = %exit_reason, "deskfleet_stopped");
    eprintln!("deskfleet stopped: {exit_reason}");
    Ok(())
}
