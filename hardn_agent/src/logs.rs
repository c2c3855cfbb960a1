//! Log tailing and severity classification.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::config::{AgentConfig, LogSource};
use crate::runner::{CommandRunner, CommandSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
}

impl Severity {
    /// Case-insensitive substring rules, first match wins:
    /// failed/error, then warning/warn, then success/accepted, else info.
    pub fn classify(line: &str) -> Severity {
        let l = line.to_ascii_lowercase();
        if l.contains("failed") || l.contains("error") {
            Severity::Error
        } else if l.contains("warning") || l.contains("warn") {
            Severity::Warning
        } else if l.contains("success") || l.contains("accepted") {
            Severity::Success
        } else {
            Severity::Info
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Success => "success",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub line: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(line: impl Into<String>) -> Self {
        let line = line.into();
        let severity = Severity::classify(&line);
        Self { line, severity }
    }
}

/// Tail of the primary auth log and, when present, the hardening tool's security log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogsReport {
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardn_logs: Option<Vec<String>>,
}

impl LogsReport {
    /// All lines, primary then secondary, with blank lines dropped and a severity attached.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.logs
            .iter()
            .chain(self.hardn_logs.iter().flatten())
            .filter(|l| !l.trim().is_empty())
            .map(|l| LogEntry::new(l.as_str()))
            .collect()
    }
}

pub struct LogTailer {
    runner: Arc<dyn CommandRunner>,
    primary: LogSource,
    secondary: Option<LogSource>,
    tail: String,
    timeout: Duration,
}

impl LogTailer {
    pub fn new(cfg: &AgentConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            primary: cfg.logs.primary.clone(),
            secondary: cfg.logs.secondary.clone(),
            tail: cfg.commands.tail.clone(),
            timeout: cfg.commands.query_timeout(),
        }
    }

    /// Missing primary log → empty `logs`; missing secondary log → no `hardn_logs`.
    /// A failed tail yields an empty list for that source.
    pub async fn tail(&self) -> LogsReport {
        let logs = if exists(&self.primary.path).await {
            self.tail_source(&self.primary).await
        } else {
            Vec::new()
        };

        let hardn_logs = match &self.secondary {
            Some(src) if exists(&src.path).await => Some(self.tail_source(src).await),
            _ => None,
        };

        LogsReport { logs, hardn_logs }
    }

    async fn tail_source(&self, src: &LogSource) -> Vec<String> {
        let spec = CommandSpec::new(&self.tail, self.timeout)
            .arg("-n")
            .arg(src.lines.to_string())
            .arg(src.path.to_string_lossy());
        match self.runner.run(&spec).await {
            Ok(out) if out.success() => out.stdout.lines().map(str::to_string).collect(),
            Ok(out) => {
                debug!(path = %src.path.display(), code = ?out.code, "tail returned nonzero");
                Vec::new()
            }
            Err(e) => {
                debug!(path = %src.path.display(), "tail failed: {e}");
                Vec::new()
            }
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}
