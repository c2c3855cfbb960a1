//! Recent security log lines, coloured by severity.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::poller::Snapshot;
use crate::ui::util::{severity_color, truncate_end};

pub fn draw_logs(f: &mut ratatui::Frame<'_>, area: Rect, s: Option<&Snapshot>) {
    let block = Block::default().borders(Borders::ALL).title("Security logs");
    let inner_h = area.height.saturating_sub(2) as usize;
    let width = area.width.saturating_sub(2) as usize;

    let lines: Vec<Line> = s
        .map(|snap| {
            // newest at the bottom; keep what fits
            let start = snap.logs.len().saturating_sub(inner_h);
            snap.logs[start..]
                .iter()
                .map(|e| {
                    Line::from(Span::styled(
                        truncate_end(&e.line, width),
                        Style::default().fg(severity_color(e.severity)),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();
    f.render_widget(Paragraph::new(lines).block(block), area);
}
