//! Service control: allowlist, action parsing, authorization and execution.
mod common;

use std::sync::Arc;

use common::{Reply, ScriptedRunner};
use hardn_agent::control::{Caller, ControlExecutor, RawActionRequest, ServiceAction};
use hardn_agent::error::{ControlError, ValidationError};
use hardn_agent::AgentConfig;

fn executor(runner: Arc<ScriptedRunner>) -> ControlExecutor {
    ControlExecutor::new(&AgentConfig::default(), runner)
}

#[test]
fn action_parsing() {
    assert_eq!("restart".parse::<ServiceAction>(), Ok(ServiceAction::Restart));
    assert_eq!(
        "reload".parse::<ServiceAction>(),
        Err(ValidationError::UnknownAction("reload".into()))
    );
    assert!("Enable".parse::<ServiceAction>().is_err());
}

#[test]
fn enable_and_disable_apply_now() {
    assert_eq!(
        ServiceAction::Enable.manager_args("ufw"),
        vec!["enable", "--now", "ufw"]
    );
    assert_eq!(
        ServiceAction::Disable.manager_args("ufw"),
        vec!["disable", "--now", "ufw"]
    );
    assert_eq!(ServiceAction::Stop.manager_args("ufw"), vec!["stop", "ufw"]);
}

#[tokio::test]
async fn disallowed_service_never_runs() {
    let runner = Arc::new(ScriptedRunner::new());
    let ex = executor(runner.clone());
    for (service, action) in [
        ("nginx", "start"),
        ("ssh.service", "stop"),
        ("--all", "restart"),
        ("ufw; rm -rf /", "enable"),
        ("auditd", "stop"),
    ] {
        let err = ex
            .submit(&Caller::default(), service, action)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ControlError::Invalid(ValidationError::ServiceNotAllowed(service.into()))
        );
    }
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn missing_and_unknown_are_rejected_without_side_effects() {
    let runner = Arc::new(ScriptedRunner::new());
    let ex = executor(runner.clone());

    assert_eq!(
        ex.validate("", "start").unwrap_err(),
        ValidationError::MissingField
    );
    assert_eq!(
        ex.validate_raw(&RawActionRequest {
            service: Some("ufw".into()),
            action: None
        })
        .unwrap_err(),
        ValidationError::MissingField
    );
    assert_eq!(
        ex.validate("ufw", "mask").unwrap_err(),
        ValidationError::UnknownAction("mask".into())
    );
    assert_eq!(
        RawActionRequest::from_json(b"{not json").unwrap_err(),
        ValidationError::InvalidBody
    );
    assert_eq!(runner.call_count(), 0);
}

#[tokio::test]
async fn enable_runs_through_privilege_wrapper() {
    let runner = Arc::new(
        ScriptedRunner::new().on("sudo -n systemctl enable --now ufw", Reply::ok("")),
    );
    let ex = executor(runner.clone());

    for _ in 0..2 {
        let out = ex
            .submit(&Caller::default(), "ufw", "enable")
            .await
            .unwrap();
        assert!(out.success);
        assert_eq!(out.service, "ufw");
        assert_eq!(out.action, ServiceAction::Enable);
    }
    assert_eq!(
        runner.call_lines(),
        vec!["sudo -n systemctl enable --now ufw"; 2]
    );
    assert_eq!(runner.calls()[0].timeout, std::time::Duration::from_secs(10));
}

#[tokio::test]
async fn failure_text_is_returned_verbatim() {
    let runner = Arc::new(ScriptedRunner::new().on(
        "sudo -n systemctl restart fail2ban",
        Reply::fail(1, "Job for fail2ban.service failed.\n"),
    ));
    let out = executor(runner)
        .submit(&Caller::default(), "fail2ban", "restart")
        .await
        .unwrap();
    assert!(!out.success);
    assert_eq!(out.error, "Job for fail2ban.service failed.\n");

    let timeout = Arc::new(
        ScriptedRunner::new().on("sudo -n systemctl stop ssh", Reply::Timeout),
    );
    let out = executor(timeout)
        .submit(&Caller::default(), "ssh", "stop")
        .await
        .unwrap();
    assert!(!out.success);
    assert!(out.error.contains("timed out"));
}

#[tokio::test]
async fn empty_wrapper_runs_manager_directly() {
    let mut cfg = AgentConfig::default();
    cfg.commands.privilege_wrapper.clear();
    let runner = Arc::new(ScriptedRunner::new().on("systemctl start clamav-daemon", Reply::ok("")));
    let ex = ControlExecutor::new(&cfg, runner.clone());
    assert!(ex
        .submit(&Caller::default(), "clamav-daemon", "start")
        .await
        .unwrap()
        .success);
}

#[tokio::test]
async fn token_required_when_configured() {
    let cfg = AgentConfig {
        auth_token: Some("s3cret".into()),
        ..AgentConfig::default()
    };
    let runner = Arc::new(ScriptedRunner::new().on("sudo -n systemctl start ufw", Reply::ok("")));
    let ex = ControlExecutor::new(&cfg, runner.clone());

    let wrong = Caller {
        token: Some("nope".into()),
        origin: None,
    };
    assert_eq!(
        ex.submit(&wrong, "ufw", "start").await.unwrap_err(),
        ControlError::Unauthorized
    );
    assert_eq!(
        ex.submit(&Caller::default(), "ufw", "start").await.unwrap_err(),
        ControlError::Unauthorized
    );
    // authorization comes before validation
    assert_eq!(
        ex.submit(&wrong, "nginx", "start").await.unwrap_err(),
        ControlError::Unauthorized
    );
    assert_eq!(runner.call_count(), 0);

    let out = ex
        .submit(&Caller::local(Some("s3cret".into())), "ufw", "start")
        .await
        .unwrap();
    assert!(out.success);
}
