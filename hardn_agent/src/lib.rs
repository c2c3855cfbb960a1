//! Library for hardn_agent: security-posture collectors, the metrics sampler, the
//! service control executor and the HTTP API. The `hardn_dash` TUI links this crate
//! directly.

pub mod api;
pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod history;
pub mod host;
pub mod logs;
pub mod metrics;
pub mod runner;
pub mod sampler;
pub mod services;
pub mod shutdown;
pub mod state;
pub mod sysctl;
pub mod types;

pub use config::AgentConfig;
pub use runner::{CommandRunner, SystemRunner};
pub use state::AppState;
