//! Service status aggregation: `is-active` and `is-enabled` per monitored unit.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::debug;

use crate::config::AgentConfig;
use crate::runner::{CommandRunner, CommandSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveState {
    Active,
    Inactive,
    Unknown,
}

impl ActiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveState::Active => "active",
            ActiveState::Inactive => "inactive",
            ActiveState::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    pub name: String,
    pub status: ActiveState,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct ServiceStatusAggregator {
    runner: Arc<dyn CommandRunner>,
    services: Vec<String>,
    service_manager: String,
    timeout: Duration,
}

impl ServiceStatusAggregator {
    pub fn new(cfg: &AgentConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            services: cfg.services.clone(),
            service_manager: cfg.commands.service_manager.clone(),
            timeout: cfg.commands.query_timeout(),
        }
    }

    /// Query every service concurrently. Output order matches configuration order and a
    /// failing service never affects the others.
    pub async fn poll(&self) -> Vec<ServiceRecord> {
        join_all(self.services.iter().map(|name| self.query(name))).await
    }

    pub async fn query(&self, name: &str) -> ServiceRecord {
        let active = CommandSpec::new(&self.service_manager, self.timeout)
            .args(["is-active", name]);
        let enabled = CommandSpec::new(&self.service_manager, self.timeout)
            .args(["is-enabled", name]);
        let (active, enabled) = tokio::join!(self.runner.run(&active), self.runner.run(&enabled));

        match (active, enabled) {
            (Ok(a), Ok(e)) => ServiceRecord {
                name: name.to_string(),
                status: if a.success() {
                    ActiveState::Active
                } else {
                    ActiveState::Inactive
                },
                enabled: e.success(),
                error: None,
            },
            (Err(err), _) | (_, Err(err)) => {
                debug!(service = name, "status query failed: {err}");
                ServiceRecord {
                    name: name.to_string(),
                    status: ActiveState::Unknown,
                    enabled: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
