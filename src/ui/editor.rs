//! Authoring form overlay.

use crate::api::Category;
use crate::app::App;
use crate::form::{CoverMode, FormField, PostForm, DESCRIPTION_MAX_CHARS, MAX_CATEGORIES};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::render::centered_rect;

/// Content rows shown before older lines scroll out of view.
const CONTENT_PREVIEW_LINES: usize = 6;

pub fn render(f: &mut Frame, app: &App, form: &PostForm) {
    let area = centered_rect(80, 90, f.area());
    if area.width < 20 || area.height < 10 {
        return;
    }

    let width = area.width.saturating_sub(4) as usize;
    let mut lines = Vec::new();

    text_field(&mut lines, app, form, FormField::Title, &form.title, None);
    let counter = format!(
        "{}/{}",
        form.description.trim().chars().count(),
        DESCRIPTION_MAX_CHARS
    );
    text_field(
        &mut lines,
        app,
        form,
        FormField::Description,
        &form.description,
        Some(counter),
    );

    let mode = match form.cover_mode {
        CoverMode::Url => "URL",
        CoverMode::Upload => "file path, max 2MB",
    };
    let cover_value = if form.cover_mode == CoverMode::Upload
        && form.cover_path.is_empty()
        && form.is_edit()
    {
        "(blank keeps the current image)".to_string()
    } else {
        form.cover_text().to_string()
    };
    text_field(
        &mut lines,
        app,
        form,
        FormField::Cover,
        &cover_value,
        Some(format!("{mode} · Ctrl+U to switch")),
    );

    content_field(&mut lines, app, form, width);
    categories_field(&mut lines, app, form);

    lines.push(Line::from(""));
    if form.pending {
        lines.push(Line::from(Span::styled("Saving...", app.style("status_notice"))));
    } else if let Some(error) = &form.submit_error {
        lines.push(Line::from(Span::styled(
            format!("Save failed: {}", error),
            app.style("form_error"),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Ctrl+S save · Tab/Shift+Tab move · Esc cancel",
        app.style("post_meta"),
    )));

    f.render_widget(Clear, area);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("modal_border"))
                .title(format!(" {} ", form.heading())),
        )
        .style(app.style("detail_body"))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn label_style(app: &App, form: &PostForm, field: FormField) -> Style {
    if form.focus == field {
        app.style("form_focused")
    } else {
        app.style("form_label")
    }
}

fn label_line(app: &App, form: &PostForm, field: FormField, note: Option<String>) -> Line<'static> {
    let marker = if form.focus == field { "> " } else { "  " };
    let mut spans = vec![Span::styled(
        format!("{}{}", marker, field.label()),
        label_style(app, form, field),
    )];
    if let Some(note) = note {
        spans.push(Span::styled(format!("  ({})", note), app.style("post_meta")));
    }
    Line::from(spans)
}

fn push_error(lines: &mut Vec<Line<'static>>, app: &App, form: &PostForm, field: FormField) {
    if let Some(error) = form.error(field) {
        lines.push(Line::from(Span::styled(
            format!("    {}", error),
            app.style("form_error"),
        )));
    }
}

fn text_field(
    lines: &mut Vec<Line<'static>>,
    app: &App,
    form: &PostForm,
    field: FormField,
    value: &str,
    note: Option<String>,
) {
    lines.push(label_line(app, form, field, note));
    let cursor = if form.focus == field { "_" } else { "" };
    lines.push(Line::from(format!("    {}{}", value, cursor)));
    push_error(lines, app, form, field);
}

/// The content body shows its last few lines so the cursor stays visible.
fn content_field(lines: &mut Vec<Line<'static>>, app: &App, form: &PostForm, width: usize) {
    let chars = form.content.trim().chars().count();
    lines.push(label_line(
        app,
        form,
        FormField::Content,
        Some(format!("{chars} chars · Enter for newline")),
    ));

    let body: Vec<&str> = form.content.split('\n').collect();
    let skip = body.len().saturating_sub(CONTENT_PREVIEW_LINES);
    if skip > 0 {
        lines.push(Line::from(Span::styled(
            format!("    ... {} earlier lines", skip),
            app.style("post_meta"),
        )));
    }
    let focused = form.focus == FormField::Content;
    let last = body.len().saturating_sub(1);
    for (i, text) in body.iter().enumerate().skip(skip) {
        let cursor = if focused && i == last { "_" } else { "" };
        let shown: String = text.chars().take(width.saturating_sub(5)).collect();
        lines.push(Line::from(format!("    {}{}", shown, cursor)));
    }
    push_error(lines, app, form, FormField::Content);
}

fn categories_field(lines: &mut Vec<Line<'static>>, app: &App, form: &PostForm) {
    lines.push(label_line(
        app,
        form,
        FormField::Categories,
        Some(format!(
            "{}/{} · ←/→ move · Space toggle",
            form.selected_count(),
            MAX_CATEGORIES
        )),
    ));

    let focused = form.focus == FormField::Categories;
    let mut spans = vec![Span::raw("    ")];
    for category in Category::ALL {
        let check = if form.is_selected(category) { "[x]" } else { "[ ]" };
        let style = if focused && form.cursor_category() == category {
            app.style("filter_active")
        } else if form.is_selected(category) {
            app.style("category_tag")
        } else {
            app.style("filter_inactive")
        };
        spans.push(Span::styled(format!("{} {}", check, category.label()), style));
        spans.push(Span::raw("  "));
    }
    lines.push(Line::from(spans));
    push_error(lines, app, form, FormField::Categories);
}
