//! Metric payloads: the per-tick [`Sample`] kept in history and the detailed
//! [`MetricsReport`] served by `/api/metrics`.
//! Keep this module small and stable; it defines the wire format.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::SampleError;

/// One sampler tick. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    /// CPU utilisation in percent, or the 1-minute load average when
    /// `cpu_is_load_average` is set (degraded backend). A load average is not a percentage.
    pub cpu_percent: f64,
    pub cpu_is_load_average: bool,
    pub memory_percent: f64,
    pub disk_percent: f64,
    // cumulative rx+tx since boot; absent in degraded mode
    pub network_cumulative_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuInfo {
    pub percent: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryInfo {
    pub total: u64,
    pub available: u64,
    pub percent: f64,
    pub used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkInfo {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

/// Full reading from the rich (OS counters) backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RichMetrics {
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: DiskInfo,
    pub network: NetworkInfo,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicMemory {
    pub total: u64,
    pub available: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicDisk {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

/// What the degraded backend could gather. Parts that failed are absent and
/// described in `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_average: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<BasicMemory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<BasicDisk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedMetrics {
    pub error: String,
    pub basic_metrics: BasicMetrics,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricsReport {
    Rich(RichMetrics),
    Degraded(DegradedMetrics),
}

impl MetricsReport {
    /// Reduce to a history sample. Degraded readings missing load, memory or disk are rejected.
    pub fn to_sample(&self) -> Result<Sample, SampleError> {
        match self {
            MetricsReport::Rich(r) => Ok(Sample {
                timestamp: r.timestamp,
                cpu_percent: r.cpu.percent,
                cpu_is_load_average: false,
                memory_percent: r.memory.percent,
                disk_percent: r.disk.percent,
                network_cumulative_bytes: Some(
                    r.network.bytes_sent.saturating_add(r.network.bytes_recv),
                ),
            }),
            MetricsReport::Degraded(d) => {
                let b = &d.basic_metrics;
                let load = b
                    .load_average
                    .ok_or_else(|| SampleError::Incomplete("load average unreadable".into()))?;
                let mem = b
                    .memory
                    .as_ref()
                    .ok_or_else(|| SampleError::Incomplete("memory unreadable".into()))?;
                let disk = b
                    .disk
                    .as_ref()
                    .ok_or_else(|| SampleError::Incomplete("disk usage unreadable".into()))?;
                Ok(Sample {
                    timestamp: d.timestamp,
                    cpu_percent: load[0],
                    cpu_is_load_average: true,
                    memory_percent: mem.percent,
                    disk_percent: percent(disk.used, disk.used.saturating_add(disk.available)),
                    network_cumulative_bytes: None,
                })
            }
        }
    }
}

/// `part / whole * 100`, zero when `whole` is zero.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
