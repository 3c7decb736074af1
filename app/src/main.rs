mod cli;
mod factories;
mod orchestrator;

use clap::Parser;
use cli::UserArgs;
use eventbridge_common::Result;
use orchestrator::Orchestrator;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = UserArgs::parse();
    init_logging(&args);

    if let Err(err) = run(args).await {
        tracing::error!(error = %err, "eventbridge exited with an error");
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(args: &UserArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log.verbosity.tracing_level_filter().to_string()));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(args: UserArgs) -> Result<()> {
    let document = std::fs::read_to_string(&args.config).map_err(|err| {
        eventbridge_common::Error::Config(format!(
            "could not read config file {}: {err}",
            args.config.display()
        ))
    })?;
    let config = eventbridge_config::load_str(&document)?;

    let replay_store =
        factories::create_replay_store(&config, args.ignore_replay_network_errors).await?;
    let source = factories::create_source(
        config.sources.clone(),
        replay_store.clone(),
        &args.login_url,
        &args.api_version,
        args.connection_timeout(),
    )?;
    let sink = factories::create_sink(&config);
    let router = factories::create_router(&config)?;

    let mut orchestrator = Orchestrator::new(args.ignore_sink_errors);
    orchestrator.configure(source, sink, router, replay_store)?;

    let cancellation = CancellationToken::new();
    let watcher = cancellation.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received");
        watcher.cancel();
    });

    orchestrator.run(cancellation).await
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
