//! HTTP API end to end over a real listener.
mod common;

use std::path::Path;
use std::sync::Arc;

use common::{Reply, ScriptedRunner};
use hardn_agent::api::router;
use hardn_agent::config::MetricsBackend;
use hardn_agent::{AgentConfig, AppState};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

const DF: &str = "Filesystem 1B-blocks Used Available Use% Mounted on\n/dev/vda1 1000 400 600 40% /\n";

fn config(dir: &Path) -> AgentConfig {
    let meminfo = dir.join("meminfo");
    let loadavg = dir.join("loadavg");
    std::fs::write(&meminfo, "MemTotal: 1000 kB\nMemAvailable: 250 kB\n").unwrap();
    std::fs::write(&loadavg, "0.25 0.20 0.15 1/100 7\n").unwrap();

    let mut cfg = AgentConfig::default();
    cfg.services = vec!["ufw".into(), "ssh".into()];
    cfg.sysctl_keys = vec!["kernel.dmesg_restrict".into(), "fs.suid_dumpable".into()];
    cfg.metrics.backend = MetricsBackend::Degraded;
    cfg.metrics.meminfo_path = meminfo;
    cfg.metrics.loadavg_path = loadavg;
    cfg.logs.primary.path = dir.join("auth.log");
    cfg.logs.secondary = None;
    cfg.hardn.config_file = dir.join("hardn.conf");
    cfg.hardn.modules_dir = dir.join("modules");
    cfg
}

fn runner() -> ScriptedRunner {
    ScriptedRunner::new()
        .on("systemctl is-active ufw", Reply::ok("active"))
        .on("systemctl is-enabled ufw", Reply::fail(1, "disabled"))
        .on("systemctl is-active ssh", Reply::ok("active"))
        .on("systemctl is-enabled ssh", Reply::ok("enabled"))
        .on("sysctl -n kernel.dmesg_restrict", Reply::ok("1\n"))
        .on("sysctl -n fs.suid_dumpable", Reply::fail(255, "unknown key"))
        .on("df -B1 /", Reply::ok(DF))
        .on("uptime -p", Reply::ok("up 3 hours\n"))
        .on("sudo -n systemctl enable --now ufw", Reply::ok(""))
}

async fn serve(cfg: AgentConfig, runner: Arc<ScriptedRunner>) -> String {
    let state = AppState::build(cfg, runner);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn get(url: &str) -> (StatusCode, reqwest::header::HeaderMap, Value) {
    let res = reqwest::get(url).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    (status, headers, res.json().await.unwrap())
}

async fn post(url: &str, body: &'static str) -> (StatusCode, Value) {
    let res = reqwest::Client::new()
        .post(url)
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    (res.status(), res.json().await.unwrap())
}

#[tokio::test]
async fn unknown_path_is_json_404_with_cors() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(config(dir.path()), Arc::new(runner())).await;
    let (status, headers, body) = get(&format!("{base}/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Endpoint not found"}));
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["content-type"], "application/json");
}

#[tokio::test]
async fn responses_are_pretty_printed() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(config(dir.path()), Arc::new(runner())).await;
    let text = reqwest::get(format!("{base}/api/health"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(text.contains("\n  \"status\": \"ok\""), "{text}");
}

#[tokio::test]
async fn index_and_health() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(config(dir.path()), Arc::new(runner())).await;

    let (status, _, body) = get(&format!("{base}/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e == "POST /api/service"));

    let (_, _, body) = get(&format!("{base}/api/health")).await;
    assert_eq!(body["health"], "healthy");
}

#[tokio::test]
async fn status_services_and_sysctl() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(config(dir.path()), Arc::new(runner())).await;

    let (_, _, body) = get(&format!("{base}/api/status")).await;
    assert_eq!(body["uptime"], "up 3 hours");
    assert_eq!(body["configured"], false);
    assert_eq!(body["load_average"].as_array().unwrap().len(), 3);
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));

    let (_, _, body) = get(&format!("{base}/api/services")).await;
    assert_eq!(
        body,
        json!({"services": [
            {"name": "ufw", "status": "active", "enabled": false},
            {"name": "ssh", "status": "active", "enabled": true}
        ]})
    );

    let (_, _, body) = get(&format!("{base}/api/sysctl")).await;
    assert_eq!(
        body,
        json!({"sysctl": {"kernel.dmesg_restrict": "1", "fs.suid_dumpable": null}})
    );
}

#[tokio::test]
async fn hardn_and_logs_when_nothing_is_installed() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(config(dir.path()), Arc::new(runner())).await;

    let (_, _, body) = get(&format!("{base}/api/hardn")).await;
    assert_eq!(body, json!({"hardn_status": "not_installed", "configured": false}));

    let (_, _, body) = get(&format!("{base}/api/logs")).await;
    assert_eq!(body, json!({"logs": []}));
}

#[tokio::test]
async fn degraded_metrics_and_history() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(config(dir.path()), Arc::new(runner())).await;

    let (status, _, body) = get(&format!("{base}/api/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], "rich metrics backend not available");
    assert_eq!(body["basic_metrics"]["load_average"], json!([0.25, 0.2, 0.15]));
    assert_eq!(body["basic_metrics"]["memory"]["percent"], 75.0);
    assert_eq!(body["basic_metrics"]["disk"]["available"], 600);

    // the cold-start read above seeded the history
    let (_, _, body) = get(&format!("{base}/api/metrics/history?limit=5")).await;
    assert_eq!(body["capacity"], 50);
    let samples = body["samples"].as_array().unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0]["cpu_is_load_average"], true);
    assert_eq!(samples[0]["disk_percent"], 40.0);

    let (status, _, body) = get(&format!("{base}/api/metrics/history?limit=lots")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn service_control_rejections_have_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(runner());
    let base = serve(config(dir.path()), runner.clone()).await;
    let url = format!("{base}/api/service");

    for (body, msg) in [
        ("{oops", "Invalid JSON data"),
        (r#"{"service": 5, "action": "start"}"#, "Invalid JSON data"),
        ("[]", "Invalid JSON data"),
        ("null", "Invalid JSON data"),
        (r#"{"service": "ufw"}"#, "Missing service or action parameter"),
        (r#"{"action": "start"}"#, "Missing service or action parameter"),
        (r#"{"service": "nginx", "action": "start"}"#, "Service nginx not allowed"),
        (r#"{"service": "ufw", "action": "mask"}"#, "Unknown action: mask"),
    ] {
        let (status, json) = post(&url, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json, json!({"error": msg}));
    }
    assert!(runner.call_lines().iter().all(|l| !l.starts_with("sudo")));
}

#[tokio::test]
async fn service_control_succeeds_and_repeats() {
    let dir = tempfile::tempdir().unwrap();
    let runner = Arc::new(runner());
    let base = serve(config(dir.path()), runner.clone()).await;
    let url = format!("{base}/api/service");

    for _ in 0..2 {
        let (status, body) = post(&url, r#"{"service": "ufw", "action": "enable"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"service": "ufw", "action": "enable", "success": true, "output": "", "error": ""})
        );
    }
    let sudo_calls = runner
        .call_lines()
        .into_iter()
        .filter(|l| l.starts_with("sudo"))
        .count();
    assert_eq!(sudo_calls, 2);
}

#[tokio::test]
async fn wrong_method_is_json_405() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(config(dir.path()), Arc::new(runner())).await;
    let (status, headers, body) = get(&format!("{base}/api/service")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body["error"].is_string());
    assert_eq!(headers["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn token_hook_guards_service_control() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.auth_token = Some("letmein".into());
    let runner = Arc::new(runner());
    let base = serve(cfg, runner.clone()).await;
    let url = format!("{base}/api/service");
    let body = r#"{"service": "ufw", "action": "enable"}"#;
    let client = reqwest::Client::new();

    let res = client
        .post(&url)
        .bearer_auth("wrong")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // bad body but bad token: still 401
    let res = client.post(&url).body("{oops").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(runner.call_count(), 0);

    let res = client
        .post(&url)
        .bearer_auth("letmein")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{url}?token=letmein"))
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(runner.call_count(), 2);
}
