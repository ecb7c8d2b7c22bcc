//! Render functions for the TUI.
//!
//! Lays out the filter bar, the post list, the detail pane and the status
//! bar, then draws any open modal on top.

use crate::app::{App, ConfirmDelete, Modal};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::{detail, editor, filters, posts, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(filters::HEIGHT),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    filters::render(f, app, rows[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[1]);

    posts::render(f, app, panels[0]);
    detail::render(f, app, panels[1]);
    status::render(f, app, rows[2]);

    match &app.modal {
        Some(Modal::Form(form)) => editor::render(f, app, form),
        Some(Modal::ConfirmDelete(confirm)) => render_confirm_overlay(f, app, confirm),
        None => {}
    }
}

/// Rect of `percent_x` by `percent_y` of `area`, centered.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_confirm_overlay(f: &mut Frame, app: &App, confirm: &ConfirmDelete) {
    let area = f.area();

    let width = 54u16.min(area.width.saturating_sub(4));
    let height = 8u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height);

    if overlay.width < 10 || overlay.height < 5 {
        return;
    }

    let mut lines = vec![
        Line::from(format!("Delete \"{}\"?", confirm.title)),
        Line::from(""),
        Line::from("This cannot be undone."),
        Line::from(""),
    ];
    if confirm.pending {
        lines.push(Line::from(Span::styled("Deleting...", app.style("status_notice"))));
    } else if let Some(error) = &confirm.error {
        lines.push(Line::from(Span::styled(
            format!("Delete failed: {}", error),
            app.style("form_error"),
        )));
    } else {
        lines.push(Line::from("(y) Delete  (n/Esc) Cancel"));
    }

    f.render_widget(Clear, overlay);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("modal_border"))
                .title(" Delete Blog "),
        )
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(app.style("detail_body"));

    f.render_widget(paragraph, overlay);
}
