//! Monitored services table and the controllable-service picker.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Row, Table},
};

use crate::poller::Snapshot;
use crate::ui::util::{state_color, truncate_middle};

pub fn draw_services(f: &mut ratatui::Frame<'_>, area: Rect, s: Option<&Snapshot>) {
    let block = Block::default().borders(Borders::ALL).title("Services");
    let Some(snap) = s else {
        f.render_widget(block, area);
        return;
    };

    let rows: Vec<Row> = snap
        .services
        .iter()
        .map(|r| {
            let enabled = if r.enabled { "enabled" } else { "disabled" };
            Row::new(vec![
                Cell::from(r.name.clone()),
                Cell::from(r.status.as_str()).style(Style::default().fg(state_color(r.status))),
                Cell::from(enabled).style(Style::default().fg(if r.enabled {
                    Color::Green
                } else {
                    Color::DarkGray
                })),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(9),
            Constraint::Length(9),
        ],
    )
    .header(
        Row::new(vec!["Service", "State", "Boot"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);
    f.render_widget(table, area);
}

/// `controllable` comes from config; state is looked up in the latest snapshot.
pub fn draw_controls(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    controllable: &[String],
    selected: usize,
    s: Option<&Snapshot>,
) {
    let items: Vec<ListItem> = controllable
        .iter()
        .map(|name| {
            let rec = s.and_then(|snap| snap.services.iter().find(|r| &r.name == name));
            let state = match rec {
                Some(r) => Span::styled(r.status.as_str(), Style::default().fg(state_color(r.status))),
                None => Span::styled("?", Style::default().fg(Color::DarkGray)),
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<16}", truncate_middle(name, 15))),
                state,
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Controls  e:enable d:disable s:start x:stop r:restart"),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut st = ListState::default();
    if !controllable.is_empty() {
        st.select(Some(selected.min(controllable.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut st);
}
