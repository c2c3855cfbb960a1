//! Small UI helpers: human-readable sizes, truncation, status colours.

use hardn_agent::logs::Severity;
use hardn_agent::services::ActiveState;
use ratatui::style::Color;

pub fn human(b: u64) -> String {
    const K: f64 = 1024.0;
    let b = b as f64;
    if b < K { return format!("{b:.0}B"); }
    let kb = b / K;
    if kb < K { return format!("{kb:.1}KB"); }
    let mb = kb / K;
    if mb < K { return format!("{mb:.1}MB"); }
    let gb = mb / K;
    if gb < K { return format!("{gb:.1}GB"); }
    let tb = gb / K;
    format!("{tb:.2}TB")
}

/// Char-aware; log lines are not always ASCII.
pub fn truncate_middle(s: &str, max: usize) -> String {
    let n = s.chars().count();
    if n <= max { return s.to_string(); }
    if max <= 3 { return "...".into(); }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(n - right).collect();
    format!("{head}...{tail}")
}

pub fn truncate_end(s: &str, max: usize) -> String {
    if s.chars().count() <= max { return s.to_string(); }
    if max <= 1 { return "…".into(); }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}

pub fn severity_color(s: Severity) -> Color {
    match s {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
        Severity::Success => Color::Green,
        Severity::Info => Color::Gray,
    }
}

pub fn state_color(s: ActiveState) -> Color {
    match s {
        ActiveState::Active => Color::Green,
        ActiveState::Inactive => Color::Red,
        ActiveState::Unknown => Color::Yellow,
    }
}

/// Green below 70%, yellow below 90%, red above.
pub fn usage_color(pct: f64) -> Color {
    if pct < 70.0 { Color::Green } else if pct < 90.0 { Color::Yellow } else { Color::Red }
}
