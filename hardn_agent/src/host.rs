//! Host summary for `/api/status` and the hardening tool's own status report for `/api/hardn`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sysinfo::System;

use crate::config::{AgentConfig, HardnPaths};
use crate::runner::{CommandRunner, CommandSpec};

const HARDN_STATUS_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStatus {
    pub hostname: String,
    pub uptime: String,
    pub load_average: [f64; 3],
    /// ISO-8601 / RFC 3339
    pub timestamp: String,
    pub configured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HardnState {
    Available,
    Error,
    NotInstalled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardnStatus {
    pub hardn_status: HardnState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub configured: bool,
}

pub struct HostProbe {
    runner: Arc<dyn CommandRunner>,
    uptime: String,
    shell: String,
    paths: HardnPaths,
    query_timeout: Duration,
    action_timeout: Duration,
}

pub fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .or_else(System::host_name)
        .unwrap_or_else(|| "unknown".into())
}

pub fn load_average() -> [f64; 3] {
    let l = System::load_average();
    [l.one, l.five, l.fifteen]
}

impl HostProbe {
    pub fn new(cfg: &AgentConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            uptime: cfg.commands.uptime.clone(),
            shell: cfg.commands.shell.clone(),
            paths: cfg.hardn.clone(),
            query_timeout: cfg.commands.query_timeout(),
            action_timeout: cfg.commands.action_timeout(),
        }
    }

    pub async fn status(&self) -> HostStatus {
        HostStatus {
            hostname: hostname(),
            uptime: self.uptime_text().await,
            load_average: load_average(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            configured: exists(&self.paths.config_file).await,
        }
    }

    /// `uptime -p`, or `"unknown"`.
    pub async fn uptime_text(&self) -> String {
        let spec = CommandSpec::new(&self.uptime, self.query_timeout).arg("-p");
        match self.runner.run(&spec).await {
            Ok(out) if out.success() => out.stdout.trim().to_string(),
            _ => "unknown".into(),
        }
    }

    /// Sources the hardening tool's status module and runs `show_hardening_status`.
    pub async fn hardn_status(&self) -> HardnStatus {
        let module = self.paths.status_module();
        if !exists(&module).await {
            return HardnStatus {
                hardn_status: HardnState::NotInstalled,
                output: None,
                error: None,
                configured: false,
            };
        }

        let spec = CommandSpec::new(&self.shell, self.action_timeout)
            .arg("-c")
            .arg(format!(
                "source {} && show_hardening_status",
                shell_quote(&module)
            ))
            .env("HARDN_MODULES_DIR", path_str(&self.paths.modules_dir))
            .env("HARDN_LOG_DIR", path_str(&self.paths.log_dir))
            .env("HARDN_CONFIG_DIR", path_str(&self.paths.config_dir));

        match self.runner.run(&spec).await {
            Ok(out) if out.success() => HardnStatus {
                hardn_status: HardnState::Available,
                output: Some(
                    out.stdout
                        .split('\n')
                        .take(HARDN_STATUS_LINES)
                        .map(str::to_string)
                        .collect(),
                ),
                error: None,
                configured: true,
            },
            Ok(out) => HardnStatus {
                hardn_status: HardnState::Error,
                output: None,
                error: Some(out.stderr),
                configured: false,
            },
            Err(e) => HardnStatus {
                hardn_status: HardnState::Error,
                output: None,
                error: Some(e.to_string()),
                configured: false,
            },
        }
    }
}

fn path_str(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

fn shell_quote(p: &Path) -> String {
    format!("'{}'", p.to_string_lossy().replace('\'', r"'\''"))
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}
