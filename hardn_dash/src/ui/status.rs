//! One-line footer with the last action result and key hints.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

pub fn draw_status(f: &mut ratatui::Frame<'_>, area: Rect, status: Option<&(String, Color)>) {
    let mut spans = vec![Span::styled(
        "↑/↓ select  e/d/s/x/r act  q quit",
        Style::default().fg(Color::DarkGray),
    )];
    if let Some((msg, color)) = status {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(msg.clone(), Style::default().fg(*color)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
