//! Shared agent state: collectors, the sampler and the control executor.

use std::sync::Arc;

use crate::config::AgentConfig;
use crate::control::ControlExecutor;
use crate::host::HostProbe;
use crate::logs::LogTailer;
use crate::metrics::select_source;
use crate::runner::CommandRunner;
use crate::sampler::Sampler;
use crate::services::ServiceStatusAggregator;
use crate::sysctl::SysctlReader;

#[derive(Clone)]
pub struct AppState {
    // On-demand collectors
    pub services: Arc<ServiceStatusAggregator>,
    pub sysctl: Arc<SysctlReader>,
    pub logs: Arc<LogTailer>,
    pub host: Arc<HostProbe>,

    // Background sampling; the only mutable shared data
    pub sampler: Arc<Sampler>,

    pub executor: Arc<ControlExecutor>,
}

impl AppState {
    pub fn build(config: AgentConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let source = select_source(&config.metrics, &config.commands, runner.clone());
        let sampler = Arc::new(Sampler::new(source, config.metrics.history_capacity));
        Self {
            services: Arc::new(ServiceStatusAggregator::new(&config, runner.clone())),
            sysctl: Arc::new(SysctlReader::new(&config, runner.clone())),
            logs: Arc::new(LogTailer::new(&config, runner.clone())),
            host: Arc::new(HostProbe::new(&config, runner.clone())),
            executor: Arc::new(ControlExecutor::new(&config, runner)),
            sampler,
        }
    }
}
