//! Task board rendering: tab bar plus either three kanban columns or a
//! single status list.

use std::collections::HashMap;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crewboard_proto::member::MemberId;
use crewboard_proto::task::{Task, TaskStatus};

use super::theme;
use crate::app::{App, PanelFocus};
use crate::board::selection::BoardTab;
use crate::board::views::BoardView;

/// Render the board area.
pub fn render(frame: &mut Frame, area: Rect, app: &App, view: &BoardView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    render_tabs(frame, chunks[0], app, view);

    let members = app.members();
    let names: HashMap<&MemberId, &str> = members
        .iter()
        .map(|m| (&m.id, m.full_name.as_str()))
        .collect();

    match app.selection.active_tab.status() {
        Some(status) => render_column(frame, chunks[1], app, view, status, &names),
        None => {
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Ratio(1, 3); 3])
                .split(chunks[1]);
            for (status, column_area) in TaskStatus::ALL.into_iter().zip(columns.iter()) {
                render_column(frame, *column_area, app, view, status, &names);
            }
        }
    }
}

fn render_tabs(frame: &mut Frame, area: Rect, app: &App, view: &BoardView) {
    let mut spans = Vec::new();
    for tab in BoardTab::ALL {
        let label = match tab.status() {
            Some(status) => format!(" {} ({}) ", tab.label(), view.counts.of(status)),
            None => format!(" {} ({}) ", tab.label(), view.counts.total),
        };
        let style = if tab == app.selection.active_tab {
            theme::selected()
        } else {
            theme::dimmed()
        };
        spans.push(Span::styled(label, style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_column(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    view: &BoardView,
    status: TaskStatus,
    names: &HashMap<&MemberId, &str>,
) {
    let is_focused = app.focus == PanelFocus::Tasks && app.focused_column == status;
    let is_drop_target = app.drag.hovered() == Some(status);
    let tasks = view.column(status);

    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(idx, task)| {
            let is_cursor = is_focused && idx == app.card_cursor;
            let is_dragged = app.drag.dragged() == Some(&task.id);
            let style = if is_dragged {
                theme::normal().fg(theme::DROP_TARGET)
            } else if is_cursor {
                theme::selected()
            } else if app.is_pending(&task.id) {
                theme::pending()
            } else {
                theme::normal()
            };
            card(task, names).style(style)
        })
        .collect();

    let border_style = if is_drop_target {
        theme::normal().fg(theme::DROP_TARGET)
    } else if is_focused {
        theme::highlighted()
    } else {
        theme::normal()
    };

    let block = Block::default()
        .title(Span::styled(
            format!("{} ({})", status.label(), tasks.len()),
            theme::panel_title(theme::status_color(status)),
        ))
        .borders(Borders::ALL)
        .border_style(border_style);

    frame.render_widget(List::new(items).block(block), area);
}

fn card<'a>(task: &'a Task, names: &HashMap<&MemberId, &str>) -> ListItem<'a> {
    let assignee = task
        .assigned_to
        .as_ref()
        .map_or("committee-wide", |id| {
            names.get(id).copied().unwrap_or("unknown member")
        });

    let mut meta = vec![
        Span::styled(
            task.priority.to_string(),
            theme::normal().fg(theme::priority_color(task.priority)),
        ),
        Span::styled(
            format!(" · {}", task.committee.as_deref().unwrap_or("all")),
            theme::dimmed(),
        ),
        Span::styled(format!(" · {assignee}"), theme::dimmed()),
    ];
    if let Some(due) = task.due_date {
        meta.push(Span::styled(format!(" · due {due}"), theme::dimmed()));
    }
    if let Some(hours) = task.estimated_hours {
        meta.push(Span::styled(format!(" · {hours}h"), theme::dimmed()));
    }

    ListItem::new(vec![
        Line::from(Span::styled(task.title.as_str(), theme::bold())),
        Line::from(meta),
    ])
}
