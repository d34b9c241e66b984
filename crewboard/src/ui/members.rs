//! Member sidebar: search box, committee filter, member list and
//! per-committee progress.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::theme;
use crate::app::{App, PanelFocus};
use crate::board::views::BoardView;

const BAR_WIDTH: usize = 10;

/// Render the sidebar.
pub fn render(frame: &mut Frame, area: Rect, app: &App, view: &BoardView) {
    let progress_height = u16::try_from(view.progress.len())
        .unwrap_or(u16::MAX)
        .saturating_add(2);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(progress_height),
        ])
        .split(area);

    render_filters(frame, chunks[0], app);
    render_list(frame, chunks[1], app, view);
    render_progress(frame, chunks[2], view);
}

fn render_filters(frame: &mut Frame, area: Rect, app: &App) {
    let search_style = if app.searching {
        theme::highlighted()
    } else {
        theme::normal()
    };
    let line = Line::from(vec![
        Span::styled("/", theme::dimmed()),
        Span::styled(app.selection.search_text.as_str(), search_style),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", app.selection.committee_filter),
            theme::dimmed(),
        ),
    ]);
    let block = Block::default()
        .title("Search")
        .borders(Borders::ALL)
        .border_style(search_style);
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_list(frame: &mut Frame, area: Rect, app: &App, view: &BoardView) {
    let is_focused = app.focus == PanelFocus::Members;

    let items: Vec<ListItem> = view
        .members
        .iter()
        .enumerate()
        .map(|(idx, member)| {
            let is_cursor = idx == app.member_cursor;
            let is_selected = app.selection.selected_member.as_ref() == Some(&member.id);

            let mut spans = vec![
                Span::styled("● ", theme::normal().fg(theme::presence_color(member.status))),
                Span::raw(member.full_name.as_str()),
            ];
            if member.is_leader {
                spans.push(Span::styled(" ★", theme::normal().fg(theme::WARNING)));
            }
            spans.push(Span::styled(
                format!(" {}", member.committee),
                theme::dimmed(),
            ));

            let style = if is_cursor && is_focused {
                theme::selected()
            } else if is_selected {
                theme::highlighted()
            } else {
                theme::normal()
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(
            format!("Members ({})", view.members.len()),
            theme::panel_title(theme::MEMBERS_TITLE),
        ))
        .borders(Borders::ALL)
        .border_style(if is_focused {
            theme::highlighted()
        } else {
            theme::normal()
        });

    frame.render_widget(List::new(items).block(block), area);
}

fn render_progress(frame: &mut Frame, area: Rect, view: &BoardView) {
    let lines: Vec<Line> = view
        .progress
        .iter()
        .map(|p| {
            let filled = usize::from(p.percent) * BAR_WIDTH / 100;
            Line::from(vec![
                Span::raw(format!("{:<10.10} ", p.committee)),
                Span::styled("█".repeat(filled), theme::normal().fg(theme::SUCCESS)),
                Span::styled("░".repeat(BAR_WIDTH - filled), theme::dimmed()),
                Span::styled(format!(" {:>3}%", p.percent), theme::dimmed()),
            ])
        })
        .collect();

    let block = Block::default().title("Progress").borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
