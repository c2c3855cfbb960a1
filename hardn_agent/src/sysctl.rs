//! Kernel parameter reads via `sysctl -n`. Never cached.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::debug;

use crate::config::AgentConfig;
use crate::runner::{CommandRunner, CommandSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysctlRecord {
    pub key: String,
    pub value: Option<String>,
}

/// Ordered key → value readings. Serializes as a JSON object in configured order with
/// `null` for unreadable keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysctlSnapshot(pub Vec<SysctlRecord>);

impl SysctlSnapshot {
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.0
            .iter()
            .find(|r| r.key == key)
            .map(|r| r.value.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SysctlRecord> {
        self.0.iter()
    }
}

impl Serialize for SysctlSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for r in &self.0 {
            map.serialize_entry(&r.key, &r.value)?;
        }
        map.end()
    }
}

pub struct SysctlReader {
    runner: Arc<dyn CommandRunner>,
    keys: Vec<String>,
    program: String,
    timeout: Duration,
}

impl SysctlReader {
    pub fn new(cfg: &AgentConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            keys: cfg.sysctl_keys.clone(),
            program: cfg.commands.sysctl.clone(),
            timeout: cfg.commands.query_timeout(),
        }
    }

    pub async fn read_all(&self) -> SysctlSnapshot {
        SysctlSnapshot(join_all(self.keys.iter().map(|k| self.read(k))).await)
    }

    pub async fn read(&self, key: &str) -> SysctlRecord {
        let spec = CommandSpec::new(&self.program, self.timeout).args(["-n", key]);
        let value = match self.runner.run(&spec).await {
            Ok(out) if out.success() => Some(out.stdout.trim().to_string()),
            Ok(out) => {
                debug!(key, code = ?out.code, "sysctl read returned nonzero");
                None
            }
            Err(e) => {
                debug!(key, "sysctl read failed: {e}");
                None
            }
        };
        SysctlRecord {
            key: key.to_string(),
            value,
        }
    }
}
