use crate::api::Post;
use crate::app::{App, DetailState, Focus};
use crate::util::{display_width, strip_control_chars};
use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Frames of the loading spinner.
pub(super) const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Render the detail pane for the current selection.
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    app.detail_visible_lines = area.height.saturating_sub(2) as usize;

    let lines: Vec<Line<'static>> = match &app.detail {
        DetailState::Empty => placeholder(app, "Select a blog from the list to read it."),
        DetailState::Loading { .. } => {
            let frame = SPINNER[app.spinner_frame % SPINNER.len()];
            placeholder(app, &format!("{} Loading blog...", frame))
        }
        DetailState::NotFound { id } => vec![
            Line::from(Span::styled("Blog not found", app.style("detail_error"))),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    "No blog with id {} exists. It may have been deleted.",
                    strip_control_chars(id)
                ),
                app.style("detail_meta"),
            )),
        ],
        DetailState::Failed { message, .. } => vec![
            Line::from(Span::styled("Failed to load blog", app.style("detail_error"))),
            Line::from(""),
            Line::from(strip_control_chars(message).into_owned()),
            Line::from(""),
            Line::from(Span::styled("Press r to retry.", app.style("detail_meta"))),
        ],
        DetailState::Loaded(post) => post_lines(app, post),
    };

    app.detail_total_lines = wrapped_height(&lines, inner_width);
    let max_scroll = app
        .detail_total_lines
        .saturating_sub(app.detail_visible_lines);
    app.detail_scroll = app.detail_scroll.min(max_scroll);

    let title = match &app.detail {
        DetailState::Loaded(_) => format!(" Blog · {}% ", app.reading_progress()),
        _ => " Blog ".to_string(),
    };
    let border_style = if app.focus == Focus::Detail && app.modal.is_none() {
        app.style("panel_border_focused")
    } else {
        app.style("panel_border")
    };

    // ratatui scroll offsets are u16.
    let scroll = app.detail_scroll.min(u16::MAX as usize) as u16;
    let paragraph = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(title),
        )
        .style(app.style("detail_body"))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));

    f.render_widget(paragraph, area);
}

fn placeholder(app: &App, text: &str) -> Vec<Line<'static>> {
    vec![Line::from(Span::styled(text.to_string(), app.style("detail_meta")))]
}

/// Header, description and body paragraphs of `post`.
fn post_lines(app: &App, post: &Post) -> Vec<Line<'static>> {
    let meta = app.style("detail_meta");
    let categories = post
        .category
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(" · ");
    let minutes = post.reading_minutes();

    let cover = if post.has_embedded_cover() {
        "Cover: embedded image".to_string()
    } else {
        format!("Cover: {}  (o to open)", strip_control_chars(&post.cover_image))
    };

    let mut lines = vec![
        Line::from(Span::styled(
            strip_control_chars(&post.title).into_owned(),
            app.style("detail_title"),
        )),
        Line::from(vec![
            Span::styled(
                format!("{} · {} min read · ", post.display_date(), minutes),
                meta,
            ),
            Span::styled(categories, app.style("category_tag")),
        ]),
        Line::from(Span::styled(cover, meta)),
        Line::from(""),
        Line::from(Span::styled(
            strip_control_chars(&post.description).into_owned(),
            app.style("detail_body").add_modifier(Modifier::ITALIC),
        )),
        Line::from(""),
    ];

    for paragraph in post.paragraphs() {
        for text_line in paragraph.lines() {
            lines.push(Line::from(strip_control_chars(text_line).into_owned()));
        }
        lines.push(Line::from(""));
    }
    lines.pop();
    lines
}

/// Rows `lines` occupy when wrapped at `width` columns.
///
/// Counts by character width, so word wrapping can take a few more rows;
/// the result is used for scroll limits and progress only.
pub(super) fn wrapped_height(lines: &[Line], width: usize) -> usize {
    if width == 0 {
        return lines.len();
    }
    lines
        .iter()
        .map(|line| {
            let w: usize = line.spans.iter().map(|s| display_width(&s.content)).sum();
            w.div_ceil(width).max(1)
        })
        .sum()
}
