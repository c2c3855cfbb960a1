//! Kernel parameter list.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::poller::Snapshot;

pub fn draw_sysctl(f: &mut ratatui::Frame<'_>, area: Rect, s: Option<&Snapshot>) {
    let block = Block::default().borders(Borders::ALL).title("Kernel parameters");
    let lines: Vec<Line> = s
        .map(|snap| {
            snap.sysctl
                .iter()
                .map(|r| {
                    let value = match &r.value {
                        Some(v) => Span::styled(v.clone(), Style::default().fg(Color::Cyan)),
                        None => Span::styled("unavailable", Style::default().fg(Color::DarkGray)),
                    };
                    Line::from(vec![Span::raw(format!("{} = ", r.key)), value])
                })
                .collect()
        })
        .unwrap_or_default();
    f.render_widget(Paragraph::new(lines).block(block), area);
}
