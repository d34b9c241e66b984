//! Admin login screen.

use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme;
use crate::app::App;

/// Render the password prompt. Input is masked.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let masked = "*".repeat(app.password_input.chars().count());
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled("Crewboard", theme::bold())),
        Line::from(Span::styled("Admin access required", theme::dimmed())),
        Line::from(""),
        Line::from(vec![
            Span::raw("Password: "),
            Span::styled(masked, theme::highlighted()),
            Span::styled("_", theme::normal()),
        ]),
    ];

    let block = Block::default()
        .title(Span::styled("Login", theme::panel_title(theme::HIGHLIGHT)))
        .borders(Borders::ALL)
        .border_style(theme::highlighted());

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(block);
    frame.render_widget(paragraph, area);
}
