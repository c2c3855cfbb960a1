//! Log classification and tailing.
mod common;

use std::sync::Arc;

use common::{Reply, ScriptedRunner};
use hardn_agent::config::LogSource;
use hardn_agent::logs::{LogEntry, LogTailer, LogsReport, Severity};
use hardn_agent::AgentConfig;

#[test]
fn classification_precedence() {
    assert_eq!(
        Severity::classify("sshd[1]: Failed password for root"),
        Severity::Error
    );
    assert_eq!(Severity::classify("ERROR: disk"), Severity::Error);
    assert_eq!(Severity::classify("kernel: WARNING low memory"), Severity::Warning);
    assert_eq!(Severity::classify("warn: something"), Severity::Warning);
    assert_eq!(
        Severity::classify("Accepted publickey for admin"),
        Severity::Success
    );
    assert_eq!(Severity::classify("backup success"), Severity::Success);
    assert_eq!(Severity::classify("session opened"), Severity::Info);
    // error beats everything else on the same line
    assert_eq!(
        Severity::classify("warning: accepted then failed"),
        Severity::Error
    );
    assert_eq!(Severity::classify("success with warnings"), Severity::Warning);
}

#[test]
fn classification_is_idempotent() {
    for line in ["Failed x", "warn y", "accepted z", "plain", ""] {
        let a = Severity::classify(line);
        let b = Severity::classify(line);
        assert_eq!(a, b);
        assert_eq!(LogEntry::new(line).severity, a);
    }
}

#[test]
fn entries_skip_blank_lines() {
    let report = LogsReport {
        logs: vec!["Accepted key".into(), "   ".into()],
        hardn_logs: Some(vec!["".into(), "error here".into()]),
    };
    let entries = report.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].severity, Severity::Success);
    assert_eq!(entries[1].severity, Severity::Error);
}

#[tokio::test]
async fn tails_existing_logs_and_omits_missing_secondary() {
    let dir = tempfile::tempdir().unwrap();
    let auth = dir.path().join("auth.log");
    std::fs::write(&auth, "placeholder\n").unwrap();

    let mut cfg = AgentConfig::default();
    cfg.logs.primary = LogSource {
        path: auth.clone(),
        lines: 20,
    };
    cfg.logs.secondary = Some(LogSource {
        path: dir.path().join("missing.log"),
        lines: 10,
    });

    let runner = Arc::new(ScriptedRunner::new().on(
        &format!("tail -n 20 {}", auth.display()),
        Reply::ok("line one\nFailed password\n"),
    ));
    let tailer = LogTailer::new(&cfg, runner.clone());
    let report = tailer.tail().await;

    assert_eq!(report.logs, vec!["line one", "Failed password"]);
    assert!(report.hardn_logs.is_none());
    assert_eq!(runner.call_count(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("hardn_logs").is_none());
}

#[tokio::test]
async fn missing_primary_gives_empty_list_without_running_tail() {
    let dir = tempfile::tempdir().unwrap();
    let sec = dir.path().join("security.log");
    std::fs::write(&sec, "x\n").unwrap();

    let mut cfg = AgentConfig::default();
    cfg.logs.primary.path = dir.path().join("auth.log");
    cfg.logs.secondary = Some(LogSource {
        path: sec.clone(),
        lines: 10,
    });

    let runner = Arc::new(ScriptedRunner::new().on(
        &format!("tail -n 10 {}", sec.display()),
        Reply::ok("hardening applied successfully\n"),
    ));
    let report = LogTailer::new(&cfg, runner.clone()).tail().await;

    assert!(report.logs.is_empty());
    assert_eq!(
        report.hardn_logs,
        Some(vec!["hardening applied successfully".to_string()])
    );
    assert_eq!(runner.call_lines(), vec![format!("tail -n 10 {}", sec.display())]);
}

#[tokio::test]
async fn failed_tail_yields_empty_list() {
    let dir = tempfile::tempdir().unwrap();
    let auth = dir.path().join("auth.log");
    std::fs::write(&auth, "x\n").unwrap();
    let mut cfg = AgentConfig::default();
    cfg.logs.primary.path = auth.clone();
    cfg.logs.secondary = None;

    let runner = Arc::new(ScriptedRunner::new().on(
        &format!("tail -n 20 {}", auth.display()),
        Reply::Timeout,
    ));
    let report = LogTailer::new(&cfg, runner).tail().await;
    assert!(report.logs.is_empty());
}
