//! Background sampler: one task reads the metrics source every tick, appends a
//! [`Sample`] to the shared history and keeps the latest detailed report for `/api/metrics`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::MetricsBackend;
use crate::error::SampleError;
use crate::history::SharedSeries;
use crate::metrics::MetricsSource;
use crate::shutdown::ShutdownSignal;
use crate::types::{MetricsReport, Sample};

pub type SampleBuffer = SharedSeries<Sample>;

pub struct Sampler {
    source: Mutex<Box<dyn MetricsSource>>,
    backend: MetricsBackend,
    latest: RwLock<Option<MetricsReport>>,
    history: Arc<SampleBuffer>,
}

impl Sampler {
    pub fn new(source: Box<dyn MetricsSource>, capacity: usize) -> Self {
        let backend = source.backend();
        Self {
            source: Mutex::new(source),
            backend,
            latest: RwLock::new(None),
            history: Arc::new(SampleBuffer::new(capacity)),
        }
    }

    pub fn backend(&self) -> MetricsBackend {
        self.backend
    }

    pub fn history(&self) -> &Arc<SampleBuffer> {
        &self.history
    }

    /// Latest report produced by a tick, if any.
    pub fn latest_report(&self) -> Option<MetricsReport> {
        self.latest.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// One sampler tick. A failed reading is logged and skipped; the history keeps its
    /// last valid sample.
    pub async fn tick(&self) -> Option<Sample> {
        let mut src = self.source.lock().await;
        self.sample_with(&mut **src).await
    }

    async fn sample_with(&self, src: &mut dyn MetricsSource) -> Option<Sample> {
        let report = match src.read().await {
            Ok(r) => r,
            Err(e) => {
                warn!("metrics sample failed: {e}");
                return None;
            }
        };
        *self.latest.write().unwrap_or_else(|e| e.into_inner()) = Some(report.clone());

        match report.to_sample() {
            Ok(sample) => {
                debug!(
                    cpu = sample.cpu_percent,
                    mem = sample.memory_percent,
                    disk = sample.disk_percent,
                    "sample"
                );
                self.history.append(sample.clone());
                Some(sample)
            }
            Err(e) => {
                warn!("metrics sample skipped: {e}");
                None
            }
        }
    }

    /// Report for the metrics endpoint: the cached one, or a fresh tick on cold start.
    pub async fn current_report(&self) -> Result<MetricsReport, SampleError> {
        if let Some(r) = self.latest_report() {
            return Ok(r);
        }
        let mut src = self.source.lock().await;
        // a tick may have finished while we waited for the source
        if let Some(r) = self.latest_report() {
            return Ok(r);
        }
        self.sample_with(&mut **src).await;
        drop(src);
        self.latest_report()
            .ok_or_else(|| SampleError::Unavailable("no metrics reading yet".into()))
    }
}

/// Run [`Sampler::tick`] every `period` until `stop` fires. The stop signal is checked
/// at tick boundaries.
pub fn spawn_sampler(
    sampler: Arc<Sampler>,
    period: Duration,
    mut stop: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?period, backend = ?sampler.backend(), "sampler started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = stop.wait() => break,
                _ = ticker.tick() => {}
            }
            if stop.is_triggered() {
                break;
            }
            sampler.tick().await;
        }
        info!("sampler stopped");
    })
}
