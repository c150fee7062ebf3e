mod collectors;
mod config;
mod exporters;
mod registry;
mod sampler;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::registry::Registers;
use crate::sampler::{Sampler, SAMPLE_INTERVAL};

#[derive(Parser)]
#[command(name = "hostmetrics", about = "Host metrics exporter for Prometheus")]
struct Cli {
    /// Optional TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sample once, print the exposition to stdout and exit.
    #[arg(long)]
    oneshot: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("exporter failed: {e:#}");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let registers = Arc::new(Registers::new().context("failed to register metrics")?);
    let mut sampler = Sampler::new(registers.clone(), collectors::default_collectors());

    if cli.oneshot {
        print!("{}", sample_and_render(&mut sampler, &registers).await);
        return Ok(());
    }

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;

    info!(
        addr = %config.listen,
        path = exporters::http::METRICS_PATH,
        interval_secs = SAMPLE_INTERVAL.as_secs(),
        "exporter listening"
    );

    serve(listener, registers, sampler, shutdown_signal()).await
}

/// Runs a single sample cycle and returns the rendered exposition.
async fn sample_and_render(sampler: &mut Sampler, registers: &Registers) -> String {
    sampler.sample_once().await;
    registers.render()
}

/// Serves `/metrics` while the sampler runs, until `shutdown` completes.
async fn serve<F>(
    listener: TcpListener,
    registers: Arc<Registers>,
    sampler: Sampler,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sampler_handle = tokio::spawn(sampler.run(shutdown_rx));

    axum::serve(listener, exporters::http::router(registers))
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("metrics server failed")?;

    join_sampler(sampler_handle).await?;

    info!("exporter stopped");
    Ok(())
}

async fn join_sampler(handle: JoinHandle<()>) -> anyhow::Result<()> {
    handle.await.context("sampler task failed")
}

/// Completes on Ctrl-C or SIGTERM. A signal that cannot be listened for is
/// left to external termination.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
