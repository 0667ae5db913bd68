use anyhow::Context;
use clap::Parser;

mod cli;
mod config;
mod edge;
mod gpio;
mod logging;
mod net;
mod supervisor;
mod wol;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let config_path = args.config_path();
    let file = match &config_path {
        Some(path) => config::load_config(path)?,
        None => config::FileConfig::default(),
    };
    let settings = args.resolve(file)?;

    logging::init(settings.log_level);
    match &config_path {
        Some(path) => tracing::debug!(path = %path.display(), "loaded config file"),
        None => tracing::debug!("no config file found, using defaults"),
    }

    if let Err(err) = supervisor::run(&settings.trigger).await {
        tracing::error!(error = %err, "wake stopped with an error");
        return Err(err).context("unable to run wake");
    }

    Ok(())
}
