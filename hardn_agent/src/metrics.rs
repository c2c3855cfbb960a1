//! Metrics sources. The backend is picked once at startup by [`select_source`] and kept
//! for the life of the process; there is no per-call probing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, Networks, RefreshKind, System};
use tracing::{info, warn};

use crate::config::{CommandsConfig, MetricsBackend, MetricsConfig};
use crate::error::SampleError;
use crate::runner::{CommandRunner, CommandSpec};
use crate::types::{
    percent, BasicDisk, BasicMemory, BasicMetrics, CpuInfo, DegradedMetrics, DiskInfo,
    MemoryInfo, MetricsReport, NetworkInfo, RichMetrics,
};

/// Error text the metrics endpoint reports alongside degraded readings.
pub const DEGRADED_NOTICE: &str = "rich metrics backend not available";

#[async_trait]
pub trait MetricsSource: Send {
    async fn read(&mut self) -> Result<MetricsReport, SampleError>;
    fn backend(&self) -> MetricsBackend;
}

/// Whether the OS counters backend can be used on this host.
pub fn rich_capability_available() -> bool {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return false;
    }
    let mut sys = System::new_with_specifics(
        RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
    );
    sys.refresh_memory();
    sys.total_memory() > 0
}

/// Choose the backend once: forced by config/env, or probed when `auto`.
pub fn select_source(
    cfg: &MetricsConfig,
    commands: &CommandsConfig,
    runner: Arc<dyn CommandRunner>,
) -> Box<dyn MetricsSource> {
    let wanted = cfg.effective_backend();
    let rich = match wanted {
        MetricsBackend::Rich => true,
        MetricsBackend::Degraded => false,
        MetricsBackend::Auto => rich_capability_available(),
    };
    if rich {
        info!("metrics backend: rich (sysinfo)");
        Box::new(RichSource::new(cfg.disk_mount.clone()))
    } else {
        if wanted == MetricsBackend::Auto {
            warn!("OS metrics counters unavailable; falling back to degraded metrics");
        } else {
            info!("metrics backend: degraded");
        }
        Box::new(DegradedSource::new(cfg, commands, runner))
    }
}

// ---------- Rich backend ----------

/// Reads CPU, memory, disk and network counters through `sysinfo`.
pub struct RichSource {
    sys: System,
    disks: Disks,
    nets: Networks,
    disk_mount: PathBuf,
}

impl RichSource {
    pub fn new(disk_mount: PathBuf) -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::everything());
        let mut sys = System::new_with_specifics(refresh_kind);
        // Baseline so the first tick's cpu usage is a delta, not zero.
        sys.refresh_cpu_usage();
        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            nets: Networks::new_with_refreshed_list(),
            disk_mount,
        }
    }

    fn disk_info(&self) -> Result<DiskInfo, SampleError> {
        // Longest mount point that prefixes the wanted path.
        let disk = self
            .disks
            .iter()
            .filter(|d| self.disk_mount.starts_with(d.mount_point()))
            .max_by_key(|d| d.mount_point().as_os_str().len())
            .ok_or_else(|| {
                SampleError::Incomplete(format!("no disk mounted at {}", self.disk_mount.display()))
            })?;
        let total = disk.total_space();
        let free = disk.available_space();
        let used = total.saturating_sub(free);
        Ok(DiskInfo {
            total,
            used,
            free,
            percent: percent(used, total),
        })
    }
}

#[async_trait]
impl MetricsSource for RichSource {
    async fn read(&mut self) -> Result<MetricsReport, SampleError> {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.disks.refresh(true);
        self.nets.refresh(true);

        let mem_total = self.sys.total_memory();
        if mem_total == 0 {
            return Err(SampleError::Unavailable("total memory reported as 0".into()));
        }
        let mem_available = self.sys.available_memory();
        let mem_used = mem_total.saturating_sub(mem_available);

        let network = self.nets.iter().fold(
            NetworkInfo {
                bytes_sent: 0,
                bytes_recv: 0,
                packets_sent: 0,
                packets_recv: 0,
            },
            |mut acc, (_name, data)| {
                acc.bytes_sent = acc.bytes_sent.saturating_add(data.total_transmitted());
                acc.bytes_recv = acc.bytes_recv.saturating_add(data.total_received());
                acc.packets_sent = acc
                    .packets_sent
                    .saturating_add(data.total_packets_transmitted());
                acc.packets_recv = acc
                    .packets_recv
                    .saturating_add(data.total_packets_received());
                acc
            },
        );

        Ok(MetricsReport::Rich(RichMetrics {
            cpu: CpuInfo {
                percent: f64::from(self.sys.global_cpu_usage()),
                count: self.sys.cpus().len(),
            },
            memory: MemoryInfo {
                total: mem_total,
                available: mem_available,
                percent: percent(mem_used, mem_total),
                used: mem_used,
            },
            disk: self.disk_info()?,
            network,
            timestamp: Utc::now(),
        }))
    }

    fn backend(&self) -> MetricsBackend {
        MetricsBackend::Rich
    }
}

// ---------- Degraded backend ----------

/// Fallback built from `/proc` files and `df`. CPU is the load average, not a percentage;
/// network is not reported.
pub struct DegradedSource {
    runner: Arc<dyn CommandRunner>,
    meminfo_path: PathBuf,
    loadavg_path: PathBuf,
    disk_mount: PathBuf,
    df: String,
    timeout: std::time::Duration,
}

impl DegradedSource {
    pub fn new(cfg: &MetricsConfig, commands: &CommandsConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            meminfo_path: cfg.meminfo_path.clone(),
            loadavg_path: cfg.loadavg_path.clone(),
            disk_mount: cfg.disk_mount.clone(),
            df: commands.df.clone(),
            timeout: commands.query_timeout(),
        }
    }

    async fn disk_usage(&self) -> Result<BasicDisk, String> {
        let spec = CommandSpec::new(&self.df, self.timeout)
            .arg("-B1")
            .arg(self.disk_mount.to_string_lossy());
        let out = self.runner.run(&spec).await.map_err(|e| e.to_string())?;
        if !out.success() {
            return Err(format!("df exited with {:?}: {}", out.code, out.stderr.trim()));
        }
        parse_df(&out.stdout).ok_or_else(|| "unexpected df output".to_string())
    }
}

#[async_trait]
impl MetricsSource for DegradedSource {
    async fn read(&mut self) -> Result<MetricsReport, SampleError> {
        let mut errors: Vec<String> = Vec::new();

        let load_average = match read_to_string(&self.loadavg_path).await {
            Ok(s) => {
                let l = parse_loadavg(&s);
                if l.is_none() {
                    errors.push("unparseable load average".into());
                }
                l
            }
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let memory = match read_to_string(&self.meminfo_path).await {
            Ok(s) => {
                let m = parse_meminfo(&s);
                if m.is_none() {
                    errors.push("MemTotal missing from meminfo".into());
                }
                m
            }
            Err(e) => {
                errors.push(e);
                None
            }
        };

        let disk = match self.disk_usage().await {
            Ok(d) => Some(d),
            Err(e) => {
                errors.push(e);
                None
            }
        };

        Ok(MetricsReport::Degraded(DegradedMetrics {
            error: DEGRADED_NOTICE.to_string(),
            basic_metrics: BasicMetrics {
                load_average,
                memory,
                disk,
                error: (!errors.is_empty()).then(|| errors.join("; ")),
            },
            timestamp: Utc::now(),
        }))
    }

    fn backend(&self) -> MetricsBackend {
        MetricsBackend::Degraded
    }
}

async fn read_to_string(path: &Path) -> Result<String, String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("{}: {e}", path.display()))
}

/// First three fields of `/proc/loadavg`.
pub fn parse_loadavg(s: &str) -> Option<[f64; 3]> {
    let mut it = s.split_whitespace().map(|t| t.parse::<f64>());
    let one = it.next()?.ok()?;
    let five = it.next()?.ok()?;
    let fifteen = it.next()?.ok()?;
    Some([one, five, fifteen])
}

/// `MemTotal`/`MemAvailable` from `/proc/meminfo`, converted from kB to bytes.
pub fn parse_meminfo(s: &str) -> Option<BasicMemory> {
    let field = |name: &str| -> Option<u64> {
        s.lines()
            .find(|l| l.starts_with(name))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|v| v.parse::<u64>().ok())
            .map(|kb| kb.saturating_mul(1024))
    };
    let total = field("MemTotal:")?;
    if total == 0 {
        return None;
    }
    let available = field("MemAvailable:").unwrap_or(0);
    Some(BasicMemory {
        total,
        available,
        percent: percent(total.saturating_sub(available), total),
    })
}

/// Second line of `df -B1 <mount>`: filesystem, total, used, available, ...
pub fn parse_df(s: &str) -> Option<BasicDisk> {
    let line = s.lines().nth(1)?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }
    Some(BasicDisk {
        total: fields[1].parse().ok()?,
        used: fields[2].parse().ok()?,
        available: fields[3].parse().ok()?,
    })
}
