//! CLI arg handling for the hardn_agent binary.
use assert_cmd::Command;

#[test]
fn help_mentions_short_and_long_flags() {
    let out = Command::cargo_bin("hardn_agent")
        .unwrap()
        .arg("--help")
        .output()
        .expect("run hardn_agent --help");
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    for flag in ["--host", "-H", "--port", "-p", "--verbose", "-v", "--config", "-c"] {
        assert!(text.contains(flag), "help text missing {flag}\n{text}");
    }
    assert!(text.contains("8080"));
}

#[test]
fn help_wins_over_other_flags() {
    let out = Command::cargo_bin("hardn_agent")
        .unwrap()
        .args(["-p", "9555", "--verbose", "-h"])
        .output()
        .expect("run hardn_agent");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Usage:"));
}

#[test]
fn invalid_port_fails_fast() {
    let out = Command::cargo_bin("hardn_agent")
        .unwrap()
        .args(["--port", "not-a-port"])
        .output()
        .expect("run hardn_agent");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid port"));
}

#[test]
fn unreadable_config_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::cargo_bin("hardn_agent")
        .unwrap()
        .args(["--port", "0", "--config"])
        .arg(dir.path().join("missing.json"))
        .output()
        .expect("run hardn_agent");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("configuration"));
}

#[test]
fn root_warning_follows_effective_uid() {
    let dir = tempfile::tempdir().unwrap();
    let out = Command::cargo_bin("hardn_agent")
        .unwrap()
        .args(["-H", "no-such-host.invalid", "-p", "0"])
        .env("XDG_CONFIG_HOME", dir.path())
        .env_remove("HARDN_AGENT_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("run hardn_agent");
    assert!(!out.status.success());

    let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&out.stderr));
    assert!(text.contains("no-such-host.invalid"), "{text}");
    assert_eq!(
        text.contains("not running as root"),
        !nix::unistd::geteuid().is_root(),
        "{text}"
    );
}
