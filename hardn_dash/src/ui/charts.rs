//! Metric sparklines: CPU (or load), memory, disk and network rate.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Sparkline},
};

use hardn_agent::types::Sample;

use crate::ui::util::{human, usage_color};

pub fn draw_spark(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    data: &[u64],
    max: Option<u64>,
    color: Color,
) {
    let max_points = area.width.saturating_sub(2) as usize;
    let start = data.len().saturating_sub(max_points);
    let mut spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .data(&data[start..])
        .style(Style::default().fg(color));
    if let Some(m) = max {
        spark = spark.max(m);
    }
    f.render_widget(spark, area);
}

/// Per-interval network throughput in bytes/s from cumulative counters. Samples without a
/// counter, and counter resets, contribute zero.
pub fn network_rates(samples: &[Sample]) -> Vec<u64> {
    samples
        .windows(2)
        .map(|w| match (w[0].network_cumulative_bytes, w[1].network_cumulative_bytes) {
            (Some(a), Some(b)) if b >= a => {
                let dt = (w[1].timestamp - w[0].timestamp).num_milliseconds().max(1) as f64 / 1000.0;
                ((b - a) as f64 / dt).round() as u64
            }
            _ => 0,
        })
        .collect()
}

fn pct_series(samples: &[Sample], pick: impl Fn(&Sample) -> f64) -> Vec<u64> {
    samples
        .iter()
        .map(|s| pick(s).clamp(0.0, 100.0).round() as u64)
        .collect()
}

pub fn draw_charts(f: &mut ratatui::Frame<'_>, area: Rect, samples: &[Sample]) {
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(area);

    let last = samples.last();

    // Degraded samples carry the 1-minute load average instead of a percentage.
    if last.is_some_and(|s| s.cpu_is_load_average) {
        let data: Vec<u64> = samples.iter().map(|s| (s.cpu_percent * 100.0).round() as u64).collect();
        let title = format!("Load 1m (now: {:.2})", last.map_or(0.0, |s| s.cpu_percent));
        draw_spark(f, cells[0], &title, &data, None, Color::Red);
    } else {
        let title = match last {
            Some(s) => format!("CPU (now: {:>5.1}%)", s.cpu_percent),
            None => "CPU".into(),
        };
        draw_spark(f, cells[0], &title, &pct_series(samples, |s| s.cpu_percent), Some(100), Color::Red);
    }

    let title = match last {
        Some(s) => format!("Memory (now: {:>5.1}%)", s.memory_percent),
        None => "Memory".into(),
    };
    let color = last.map_or(Color::Yellow, |s| usage_color(s.memory_percent));
    draw_spark(f, cells[1], &title, &pct_series(samples, |s| s.memory_percent), Some(100), color);

    let title = match last {
        Some(s) => format!("Disk (now: {:>5.1}%)", s.disk_percent),
        None => "Disk".into(),
    };
    let color = last.map_or(Color::Green, |s| usage_color(s.disk_percent));
    draw_spark(f, cells[2], &title, &pct_series(samples, |s| s.disk_percent), Some(100), color);

    let rates = network_rates(samples);
    let title = if last.is_some_and(|s| s.network_cumulative_bytes.is_none()) {
        "Network (n/a)".to_string()
    } else {
        format!("Network (now: {}/s)", human(rates.last().copied().unwrap_or(0)))
    };
    draw_spark(f, cells[3], &title, &rates, None, Color::Cyan);
}
