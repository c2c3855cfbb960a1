//! Entry point for the hardn_dash TUI. Parses args, starts the collectors and runs the App.

mod app;
mod poller;
mod ui;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use app::{App, DashContext};
use hardn_agent::control::Caller;
use hardn_agent::runner::{CommandRunner, SystemRunner};
use hardn_agent::sampler::spawn_sampler;
use hardn_agent::shutdown::{self, wait_for_os_signal};
use hardn_agent::{AgentConfig, AppState};
use poller::spawn_poller;
use tokio::task::JoinHandle;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const REFRESH: Duration = Duration::from_secs(5);

struct ParsedArgs {
    config: Option<PathBuf>,
}

enum Parsed {
    Run(ParsedArgs),
    Help(String),
}

fn usage(prog: &str) -> String {
    format!("Usage: {prog} [--config PATH|-c PATH] [--help|-h]")
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Parsed, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "hardn_dash".into());
    let mut config: Option<PathBuf> = None;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Parsed::Help(usage(&prog))),
            "--config" | "-c" => {
                config = Some(
                    it.next()
                        .map(PathBuf::from)
                        .ok_or_else(|| format!("{arg} requires a value. {}", usage(&prog)))?,
                );
            }
            _ if arg.starts_with("--config=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        config = Some(PathBuf::from(v));
                    }
                }
            }
            _ => return Err(format!("Unexpected argument. {}", usage(&prog))),
        }
    }
    Ok(Parsed::Run(ParsedArgs { config }))
}

/// The terminal belongs to the UI, so logs only go to `$HARDN_DASH_LOG` when set.
fn init_logging() -> anyhow::Result<()> {
    let Some(path) = env::var_os("HARDN_DASH_LOG") else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", PathBuf::from(&path).display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(Parsed::Run(v)) => v,
        Ok(Parsed::Help(msg)) => {
            println!("{msg}");
            return Ok(());
        }
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };
    init_logging()?;

    let (config, _) = AgentConfig::load(parsed.config.as_deref()).context("loading configuration")?;
    let caller = Caller::local(config.auth_token.clone());
    let controllable = config.controllable_services.clone();
    let period = config.metrics.interval();

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let state = AppState::build(config, runner);

    let (trigger, stop) = shutdown::channel();
    let trigger = Arc::new(trigger);
    let sampler = spawn_sampler(state.sampler.clone(), period, stop.clone());
    let poller = spawn_poller(state.clone(), REFRESH, stop.clone());
    {
        let trigger = trigger.clone();
        tokio::spawn(async move {
            wait_for_os_signal().await;
            trigger.trigger();
        });
    }

    let mut app = App::new(controllable);
    let res = app
        .run(DashContext {
            state,
            snapshots: poller.rx,
            refresh: poller.refresh,
            caller,
            stop,
        })
        .await;

    trigger.trigger();
    join_background([("sampler", sampler), ("poller", poller.handle)]).await;
    res
}

/// Awaits the background tasks and logs the ones that panicked or were cancelled.
async fn join_background<const N: usize>(
    tasks: [(&'static str, JoinHandle<()>); N],
) -> Vec<&'static str> {
    let mut abnormal = Vec::new();
    for (task, handle) in tasks {
        if let Err(e) = handle.await {
            warn!("{task} task ended abnormally: {e}");
            abnormal.push(task);
        }
    }
    abnormal
}
