//! Agent configuration: monitored services, control allowlist, sysctl keys, log sources,
//! sampler cadence and privilege wrapper.
//!
//! Loaded from JSON. Lookup order: explicit `--config` path, `$HARDN_AGENT_CONFIG`,
//! `$XDG_CONFIG_HOME/hardn_agent/config.json` (fallback `~/.config/hardn_agent/config.json`).
//! A missing implicit file means built-in defaults; missing fields are defaulted.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Services whose state is reported, in display order.
    pub services: Vec<String>,
    /// Services that accept control actions. Never bypassed.
    pub controllable_services: Vec<String>,
    /// Kernel parameters reported by the sysctl endpoint, in display order.
    pub sysctl_keys: Vec<String>,
    pub logs: LogsConfig,
    pub metrics: MetricsConfig,
    pub commands: CommandsConfig,
    pub hardn: HardnPaths,
    /// Shared secret required by `POST /api/service` when set.
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSource {
    pub path: PathBuf,
    pub lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogsConfig {
    pub primary: LogSource,
    pub secondary: Option<LogSource>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MetricsBackend {
    #[default]
    Auto,
    Rich,
    Degraded,
}

impl std::str::FromStr for MetricsBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "rich" => Ok(Self::Rich),
            "degraded" | "basic" => Ok(Self::Degraded),
            other => Err(format!("unknown metrics backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MetricsConfig {
    pub backend: MetricsBackend,
    pub interval_secs: u64,
    pub history_capacity: usize,
    /// Filesystem whose usage is reported as disk percent.
    pub disk_mount: PathBuf,
    // Degraded backend sources
    pub meminfo_path: PathBuf,
    pub loadavg_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandsConfig {
    pub service_manager: String,
    pub sysctl: String,
    pub tail: String,
    pub df: String,
    pub uptime: String,
    pub shell: String,
    /// Prefix for privileged invocations, e.g. `["sudo", "-n"]`. Empty runs directly.
    pub privilege_wrapper: Vec<String>,
    pub query_timeout_secs: u64,
    pub action_timeout_secs: u64,
}

/// Locations used by the external hardening tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HardnPaths {
    pub config_file: PathBuf,
    pub modules_dir: PathBuf,
    pub log_dir: PathBuf,
    pub config_dir: PathBuf,
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            services: strings(&[
                "ufw",
                "fail2ban",
                "apparmor",
                "clamav-daemon",
                "ssh",
                "auditd",
                "rsyslog",
                "systemd-timesyncd",
            ]),
            controllable_services: strings(&["ufw", "fail2ban", "apparmor", "clamav-daemon", "ssh"]),
            sysctl_keys: strings(&[
                "kernel.dmesg_restrict",
                "kernel.kptr_restrict",
                "net.ipv4.ip_forward",
                "net.ipv4.conf.all.accept_redirects",
                "net.ipv4.tcp_syncookies",
                "fs.suid_dumpable",
                "kernel.yama.ptrace_scope",
            ]),
            logs: LogsConfig::default(),
            metrics: MetricsConfig::default(),
            commands: CommandsConfig::default(),
            hardn: HardnPaths::default(),
            auth_token: None,
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            primary: LogSource {
                path: PathBuf::from("/var/log/auth.log"),
                lines: 20,
            },
            secondary: Some(LogSource {
                path: PathBuf::from("/var/log/hardn/security.log"),
                lines: 10,
            }),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            backend: MetricsBackend::Auto,
            interval_secs: 5,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            disk_mount: PathBuf::from("/"),
            meminfo_path: PathBuf::from("/proc/meminfo"),
            loadavg_path: PathBuf::from("/proc/loadavg"),
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            service_manager: "systemctl".into(),
            sysctl: "sysctl".into(),
            tail: "tail".into(),
            df: "df".into(),
            uptime: "uptime".into(),
            shell: "/bin/bash".into(),
            privilege_wrapper: strings(&["sudo", "-n"]),
            query_timeout_secs: 5,
            action_timeout_secs: 10,
        }
    }
}

impl Default for HardnPaths {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("/etc/hardn/hardn.conf"),
            modules_dir: PathBuf::from("/usr/share/hardn/modules"),
            log_dir: PathBuf::from("/var/log/hardn"),
            config_dir: PathBuf::from("/etc/hardn"),
        }
    }
}

impl HardnPaths {
    pub fn status_module(&self) -> PathBuf {
        self.modules_dir.join("status.sh")
    }
}

impl CommandsConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

impl MetricsConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Configured backend, overridable once per process with `HARDN_AGENT_METRICS_BACKEND`.
    pub fn effective_backend(&self) -> MetricsBackend {
        static ENV: OnceCell<Option<MetricsBackend>> = OnceCell::new();
        let from_env = ENV.get_or_init(|| {
            let raw = std::env::var("HARDN_AGENT_METRICS_BACKEND").ok()?;
            match raw.parse() {
                Ok(b) => Some(b),
                Err(e) => {
                    warn!("ignoring HARDN_AGENT_METRICS_BACKEND: {e}");
                    None
                }
            }
        });
        from_env.unwrap_or(self.backend)
    }
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("hardn_agent")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hardn_agent")
    }
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.json")
}

impl AgentConfig {
    /// Resolve and load the configuration. Returns the file actually used, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var_os("HARDN_AGENT_CONFIG") {
                Some(p) => (PathBuf::from(p), true),
                None => (default_config_path(), false),
            },
        };

        if !required && !path.exists() {
            info!("no config at {}, using defaults", path.display());
            let cfg = Self::default();
            cfg.validate()?;
            return Ok((cfg, None));
        }

        let cfg = Self::from_file(&path)?;
        info!("loaded config from {}", path.display());
        Ok((cfg, Some(path)))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.interval_secs == 0 {
            return Err(ConfigError::Invalid("metrics.interval_secs must be >= 1".into()));
        }
        if self.metrics.history_capacity == 0 {
            return Err(ConfigError::Invalid("metrics.history_capacity must be >= 1".into()));
        }
        if self.commands.query_timeout_secs == 0 || self.commands.action_timeout_secs == 0 {
            return Err(ConfigError::Invalid("command timeouts must be >= 1s".into()));
        }
        if let Some(name) = self
            .controllable_services
            .iter()
            .find(|s| s.is_empty() || s.starts_with('-'))
        {
            return Err(ConfigError::Invalid(format!(
                "controllable service name {name:?} is not a unit name"
            )));
        }
        if matches!(self.auth_token.as_deref(), Some("")) {
            return Err(ConfigError::Invalid("auth_token must not be empty".into()));
        }
        Ok(())
    }
}
