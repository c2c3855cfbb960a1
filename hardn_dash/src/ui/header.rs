//! Top header with hostname, uptime and load.

use ratatui::{
    layout::Rect,
    widgets::{Block, Borders},
};

use crate::poller::Snapshot;

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, s: Option<&Snapshot>) {
    let title = if let Some(snap) = s {
        let h = &snap.host;
        let [l1, l5, l15] = h.load_average;
        let hardn = if h.configured { "configured" } else { "not configured" };
        format!(
            "HARDN | host: {} | {} | load: {l1:.2} {l5:.2} {l15:.2} | hardn: {hardn} | updated {}  (press 'q' to quit)",
            h.hostname,
            h.uptime,
            snap.taken_at.format("%H:%M:%S"),
        )
    } else {
        "HARDN | collecting... (press 'q' to quit)".into()
    };
    f.render_widget(Block::default().title(title).borders(Borders::BOTTOM), area);
}
