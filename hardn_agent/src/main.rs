//! hardn_agent: HTTP API exposing security posture, metrics, logs and service control.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use nix::unistd::geteuid;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hardn_agent::api::router;
use hardn_agent::cli::{parse_args, ArgError};
use hardn_agent::runner::{CommandRunner, SystemRunner};
use hardn_agent::sampler::spawn_sampler;
use hardn_agent::shutdown::{self, wait_for_os_signal};
use hardn_agent::{AgentConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match parse_args(env::args()) {
        Ok(a) => a,
        Err(ArgError::Help(text)) => {
            println!("{text}");
            return Ok(());
        }
        Err(ArgError::Invalid(text)) => {
            eprintln!("{text}");
            std::process::exit(2);
        }
    };

    // --verbose wins over RUST_LOG
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (config, _) = AgentConfig::load(args.config.as_deref()).context("loading configuration")?;
    if !geteuid().is_root() {
        warn!("not running as root; service control and some status queries may fail");
    }
    let addr = args.resolve().await.map_err(anyhow::Error::msg)?;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let period = config.metrics.interval();
    let state = AppState::build(config, runner);

    let (trigger, stop) = shutdown::channel();
    let sampler = spawn_sampler(state.sampler.clone(), period, stop);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("hardn_agent listening on http://{}", listener.local_addr()?);

    let served = axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        wait_for_os_signal().await;
        info!("shutdown requested");
    })
    .await;

    trigger.trigger();
    if let Err(e) = sampler.await {
        warn!("sampler task ended abnormally: {e}");
    }
    served.context("serving HTTP")?;
    info!("hardn_agent stopped");
    Ok(())
}
