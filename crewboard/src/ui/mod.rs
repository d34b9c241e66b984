//! Terminal UI rendering.

pub mod board;
pub mod form;
pub mod login;
pub mod members;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, Screen};

/// Main draw function for the entire UI.
pub fn draw(frame: &mut Frame, app: &App) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let content_area = main_chunks[0];
    let status_area = main_chunks[1];

    match app.screen {
        Screen::Login => login::render(frame, content_area, app),
        Screen::Board if app.is_loading() => render_loading(frame, content_area),
        Screen::Board => {
            let view = app.view();
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
                .split(content_area);

            members::render(frame, content_chunks[0], app, &view);
            board::render(frame, content_chunks[1], app, &view);

            if let Some(task_form) = &app.form {
                form::render(frame, centered(content_area, 60, 11), app, task_form);
            }
        }
    }

    status_bar::render(frame, status_area, app);
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let paragraph = Paragraph::new("Loading board...")
        .alignment(Alignment::Center)
        .style(theme::dimmed())
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// A `width` x `height` rectangle centred in `area`, clipped to it.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
