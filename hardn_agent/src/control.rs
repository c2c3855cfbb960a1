//! Service control: allowlisted (service, action) requests turned into privileged
//! service-manager invocations.
//!
//! A [`ServiceActionRequest`] can only be obtained from [`ControlExecutor::validate`], so
//! nothing reaches the runner without passing the allowlist. Enable and disable also
//! start/stop the unit (`--now`), the same immediate effect as start and stop.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::error::{ControlError, ValidationError};
use crate::runner::{CommandRunner, CommandSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAction {
    Enable,
    Disable,
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    pub const ALL: [ServiceAction; 5] = [
        ServiceAction::Enable,
        ServiceAction::Disable,
        ServiceAction::Start,
        ServiceAction::Stop,
        ServiceAction::Restart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
        }
    }

    /// Service-manager arguments for this action on `service`.
    pub fn manager_args(&self, service: &str) -> Vec<String> {
        match self {
            ServiceAction::Enable | ServiceAction::Disable => {
                vec![self.as_str().into(), "--now".into(), service.into()]
            }
            _ => vec![self.as_str().into(), service.into()],
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownAction(s.to_string()))
    }
}

/// Raw `{service, action}` body as received; nothing is trusted yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawActionRequest {
    pub service: Option<String>,
    pub action: Option<String>,
}

impl RawActionRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|_| ValidationError::InvalidBody)
    }
}

/// An allowlisted service paired with a known action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceActionRequest {
    service: String,
    action: ServiceAction,
}

impl ServiceActionRequest {
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn action(&self) -> ServiceAction {
        self.action
    }
}

/// Result of an executed action. stdout and stderr are returned verbatim, also on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub service: String,
    pub action: ServiceAction,
    pub success: bool,
    pub output: String,
    pub error: String,
}

/// Who is asking. Built by the presentation layer.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub token: Option<String>,
    pub origin: Option<String>,
}

impl Caller {
    /// In-process caller presenting `token`, e.g. the dashboard.
    pub fn local(token: Option<String>) -> Self {
        Self {
            token,
            origin: Some("local".into()),
        }
    }
}

pub trait Authorizer: Send + Sync {
    fn authorize(&self, caller: &Caller) -> Result<(), ControlError>;
}

/// Permits everything. There is no authentication unless a token is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAccess;

impl Authorizer for OpenAccess {
    fn authorize(&self, _: &Caller) -> Result<(), ControlError> {
        Ok(())
    }
}

/// Requires the caller to present the configured token.
#[derive(Clone)]
pub struct SharedToken {
    token: String,
}

impl SharedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for SharedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedToken").finish_non_exhaustive()
    }
}

impl Authorizer for SharedToken {
    fn authorize(&self, caller: &Caller) -> Result<(), ControlError> {
        match caller.token.as_deref() {
            Some(t) if constant_time_eq(t.as_bytes(), self.token.as_bytes()) => Ok(()),
            _ => {
                warn!(origin = ?caller.origin, "rejected unauthorized control request");
                Err(ControlError::Unauthorized)
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub struct ControlExecutor {
    runner: Arc<dyn CommandRunner>,
    authorizer: Arc<dyn Authorizer>,
    allowlist: Vec<String>,
    service_manager: String,
    privilege_wrapper: Vec<String>,
    timeout: Duration,
}

impl ControlExecutor {
    pub fn new(cfg: &AgentConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let authorizer: Arc<dyn Authorizer> = match &cfg.auth_token {
            Some(t) => Arc::new(SharedToken::new(t.clone())),
            None => {
                warn!("service control endpoint has no authentication (set auth_token to require one)");
                Arc::new(OpenAccess)
            }
        };
        Self::with_authorizer(cfg, runner, authorizer)
    }

    pub fn with_authorizer(
        cfg: &AgentConfig,
        runner: Arc<dyn CommandRunner>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            runner,
            authorizer,
            allowlist: cfg.controllable_services.clone(),
            service_manager: cfg.commands.service_manager.clone(),
            privilege_wrapper: cfg.commands.privilege_wrapper.clone(),
            timeout: cfg.commands.action_timeout(),
        }
    }

    pub fn is_allowed(&self, service: &str) -> bool {
        self.allowlist.iter().any(|s| s == service)
    }

    pub fn validate(&self, service: &str, action: &str) -> Result<ServiceActionRequest, ValidationError> {
        if service.is_empty() || action.is_empty() {
            return Err(ValidationError::MissingField);
        }
        if !self.is_allowed(service) {
            return Err(ValidationError::ServiceNotAllowed(service.to_string()));
        }
        let action = action.parse::<ServiceAction>()?;
        Ok(ServiceActionRequest {
            service: service.to_string(),
            action,
        })
    }

    pub fn authorize(&self, caller: &Caller) -> Result<(), ControlError> {
        self.authorizer.authorize(caller)
    }

    /// Validate an untrusted body that already passed [`ControlExecutor::authorize`].
    pub fn validate_raw(&self, raw: &RawActionRequest) -> Result<ServiceActionRequest, ValidationError> {
        self.validate(
            raw.service.as_deref().unwrap_or_default(),
            raw.action.as_deref().unwrap_or_default(),
        )
    }

    /// Authorize, validate and execute. Any rejection happens before the runner is touched.
    pub async fn submit(
        &self,
        caller: &Caller,
        service: &str,
        action: &str,
    ) -> Result<ActionOutcome, ControlError> {
        self.authorize(caller)?;
        let req = self.validate(service, action)?;
        Ok(self.execute(&req).await)
    }

    /// Full command line for a validated request, privilege wrapper first.
    pub fn command_for(&self, req: &ServiceActionRequest) -> CommandSpec {
        let manager_args = req.action.manager_args(&req.service);
        match self.privilege_wrapper.split_first() {
            Some((program, wrapper_args)) => CommandSpec::new(program, self.timeout)
                .args(wrapper_args.iter().cloned())
                .arg(&self.service_manager)
                .args(manager_args),
            None => CommandSpec::new(&self.service_manager, self.timeout).args(manager_args),
        }
    }

    pub async fn execute(&self, req: &ServiceActionRequest) -> ActionOutcome {
        let spec = self.command_for(req);
        info!(service = %req.service, action = %req.action, "executing service action");
        let (success, output, error) = match self.runner.run(&spec).await {
            Ok(out) => (out.success(), out.stdout, out.stderr),
            Err(e) => (false, String::new(), e.to_string()),
        };
        if success {
            info!(service = %req.service, action = %req.action, "service action succeeded");
        } else {
            warn!(service = %req.service, action = %req.action, "service action failed: {}", error.trim());
        }
        ActionOutcome {
            service: req.service.clone(),
            action: req.action,
            success,
            output,
            error,
        }
    }
}
