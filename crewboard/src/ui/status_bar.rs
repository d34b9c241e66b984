//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, PanelFocus, Screen};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let help_text = if app.screen == Screen::Login {
        "Enter: log in | Esc: quit"
    } else if app.form.is_some() {
        "Tab/↑↓: field | ←→: choose | Enter: save | Esc: cancel"
    } else if app.status_picker.is_some() {
        "←→: choose status | Enter: move | Esc: cancel"
    } else if app.drag.is_dragging() {
        "←→: choose column | Space/Enter: drop | Esc: cancel"
    } else if app.searching {
        "type to search | Enter/Esc: done"
    } else {
        match app.focus {
            PanelFocus::Members => {
                "Tab: switch panel | ↑↓/jk: navigate | Enter: select member | /: search | c: committee | q: quit"
            }
            PanelFocus::Tasks => {
                "Tab: switch panel | n: new | e: edit | d: delete | s: status | Space: drag | t: tab | r: reload | q: quit"
            }
        }
    };

    let mut spans = vec![Span::styled("Crewboard", theme::bold()), Span::raw(" | ")];

    if let Some((_, choice)) = &app.status_picker {
        spans.push(Span::styled(
            format!("Move to: {} | ", choice.label()),
            theme::highlighted(),
        ));
    } else if let Some(target) = app.drag.hovered() {
        spans.push(Span::styled(
            format!("Drop on: {} | ", target.label()),
            theme::normal().fg(theme::DROP_TARGET),
        ));
    }

    if let Some(status) = &app.status {
        let color = if status.is_error {
            theme::ERROR
        } else {
            theme::SUCCESS
        };
        spans.push(Span::styled("● ", theme::normal().fg(color)));
        spans.push(Span::raw(format!("{} | ", status.text)));
    }

    spans.push(Span::styled(help_text, theme::dimmed()));

    let paragraph = Paragraph::new(Line::from(spans)).style(theme::status_bar_bg());
    frame.render_widget(paragraph, area);
}
