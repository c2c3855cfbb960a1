//! Background refresh of everything the dashboard shows, published through a watch channel.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hardn_agent::host::HostStatus;
use hardn_agent::logs::LogEntry;
use hardn_agent::services::ServiceRecord;
use hardn_agent::shutdown::ShutdownSignal;
use hardn_agent::sysctl::SysctlSnapshot;
use hardn_agent::types::Sample;
use hardn_agent::AppState;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Samples kept for the sparklines.
pub const CHART_SAMPLES: usize = 50;

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub host: HostStatus,
    pub services: Vec<ServiceRecord>,
    pub sysctl: SysctlSnapshot,
    pub logs: Vec<LogEntry>,
    pub samples: Vec<Sample>,
    pub taken_at: DateTime<Utc>,
}

pub async fn collect(state: &AppState) -> Snapshot {
    let (host, services, sysctl, logs) = tokio::join!(
        state.host.status(),
        state.services.poll(),
        state.sysctl.read_all(),
        state.logs.tail(),
    );
    Snapshot {
        host,
        services,
        sysctl,
        logs: logs.entries(),
        samples: state.sampler.history().snapshot(CHART_SAMPLES),
        taken_at: Utc::now(),
    }
}

pub struct Poller {
    pub rx: watch::Receiver<Option<Arc<Snapshot>>>,
    /// Wake the poller early, e.g. right after a service action.
    pub refresh: Arc<Notify>,
    pub handle: JoinHandle<()>,
}

pub fn spawn_poller(state: AppState, period: Duration, mut stop: ShutdownSignal) -> Poller {
    let (tx, rx) = watch::channel(None);
    let refresh = Arc::new(Notify::new());
    let wake = refresh.clone();
    let handle = tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = stop.wait() => break,
                _ = ticker.tick() => {}
                _ = wake.notified() => ticker.reset(),
            }
            if stop.is_triggered() {
                break;
            }
            let snap = collect(&state).await;
            debug!(services = snap.services.len(), logs = snap.logs.len(), "dashboard refresh");
            if tx.send(Some(Arc::new(snap))).is_err() {
                break;
            }
        }
    });
    Poller {
        rx,
        refresh,
        handle,
    }
}
