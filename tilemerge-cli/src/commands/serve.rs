//! Serve command - run the tile server until Ctrl-C.

use std::net::SocketAddr;
use std::path::Path;

use clap::Args;
use tilemerge::app::{AppConfig, TileMergeApp};
use tilemerge::logging::init_logging;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::{create_runtime, load_config, SourceArgs};
use crate::error::CliError;

/// Arguments for the serve command.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Run the serve command.
pub fn run(args: ServeArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    args.source.apply(&mut config);
    let app_config = AppConfig::from_config_file(&config)?;

    let _logging_guard = init_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        log = %config.logging.directory.join(&config.logging.file).display(),
        "TileMerge starting"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    ctrlc::set_handler(move || {
        signal_token.cancel();
    })
    .map_err(CliError::SignalHandler)?;

    let runtime = create_runtime()?;
    runtime.block_on(async move {
        let app = TileMergeApp::start(app_config).await?;
        println!("Serving tiles on http://{}/tiles/{{z}}/{{x}}/{{y}}", app.config().bind);
        println!("Press Ctrl-C to stop.");
        app.serve(shutdown).await
    })?;

    info!("TileMerge stopped");
    Ok(())
}
