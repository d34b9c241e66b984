//! New/edit task form popup.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use super::theme;
use crate::app::{App, FormField, TaskForm};

/// Render the form over the board.
pub fn render(frame: &mut Frame, area: Rect, app: &App, form: &TaskForm) {
    let committees = app.committee_choices();
    let members = app.members();

    let lines: Vec<Line> = FormField::ALL
        .into_iter()
        .map(|field| {
            let value = match field {
                FormField::Title => form.title.clone(),
                FormField::Description => form.description.clone(),
                FormField::Committee => format!("< {} >", form.committee_label(&committees)),
                FormField::Assignee => format!("< {} >", form.assignee_label(&members)),
                FormField::Priority => format!("< {} >", form.priority),
                FormField::DueDate => form.due_date.clone(),
                FormField::Estimate => form.estimate.clone(),
            };
            let style = if field == form.field {
                theme::highlighted()
            } else {
                theme::normal()
            };
            Line::from(vec![
                Span::styled(format!("{:<18}", field.label()), theme::dimmed()),
                Span::styled(value, style),
            ])
        })
        .collect();

    let title = if form.editing.is_some() {
        "Edit task"
    } else {
        "New task"
    };
    let block = Block::default()
        .title(Span::styled(title, theme::panel_title(theme::HIGHLIGHT)))
        .borders(Borders::ALL)
        .border_style(theme::highlighted());

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}
