use crate::app::{App, Focus, ListState as Load};
use crate::util::{strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

/// Render the post list panel
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let border_style = if app.focus == Focus::List && app.modal.is_none() {
        app.style("panel_border_focused")
    } else {
        app.style("panel_border")
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(format!(" Blogs · {} ", app.stats().summary()));

    if let Some(message) = empty_message(app) {
        let paragraph = Paragraph::new(message)
            .block(block)
            .style(app.style("post_meta"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
        return;
    }

    // Two rows per post: title, then date and categories.
    let text_width = area.width.saturating_sub(4) as usize;
    let needle = app.filter.search_term();
    let selected = app.selected_row();

    let items: Vec<ListItem> = app
        .visible_posts()
        .enumerate()
        .map(|(row, post)| {
            let title = strip_control_chars(&post.title);
            let title = truncate_to_width(&title, text_width);
            let base = if Some(row) == selected {
                app.style("post_selected")
            } else {
                app.style("post_title")
            };
            let title_line = Line::from(highlight_spans(
                &title,
                needle,
                base,
                app.style("post_match"),
            ));

            let categories = post
                .category
                .iter()
                .map(|c| c.label())
                .collect::<Vec<_>>()
                .join(", ");
            let meta = truncate_to_width(
                &format!("{} · {}", post.display_date(), categories),
                text_width,
            )
            .into_owned();
            let meta_line = Line::from(Span::styled(meta, app.style("post_meta")));

            ListItem::new(vec![title_line, meta_line])
        })
        .collect();

    let list = List::new(items).block(block);
    let mut state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, area, &mut state);
}

/// Placeholder text when there is nothing to list.
fn empty_message(app: &App) -> Option<String> {
    match &app.list_state {
        Load::Loading if app.posts.is_empty() => Some("Loading blogs...".into()),
        Load::Failed(message) if app.posts.is_empty() => Some(format!(
            "Failed to load blogs:\n{}\n\nPress r to retry.",
            strip_control_chars(message)
        )),
        _ if app.posts.is_empty() => Some("No blogs yet. Press n to write one.".into()),
        _ if app.visible.is_empty() => {
            Some("No blogs match the current search or filters.\n\nEsc clears the search, 0 clears categories.".into())
        }
        _ => None,
    }
}

/// Split `text` into spans, styling case-insensitive matches of `needle`.
pub(super) fn highlight_spans(
    text: &str,
    needle: Option<&str>,
    base: Style,
    matched: Style,
) -> Vec<Span<'static>> {
    let Some(needle) = needle.filter(|n| !n.is_empty()) else {
        return vec![Span::styled(text.to_string(), base)];
    };

    let mut spans = Vec::new();
    let mut last = 0;
    let mut cursor = 0;
    while cursor < text.len() {
        match match_len_at(&text[cursor..], needle) {
            Some(len) => {
                if last < cursor {
                    spans.push(Span::styled(text[last..cursor].to_string(), base));
                }
                spans.push(Span::styled(text[cursor..cursor + len].to_string(), matched));
                cursor += len;
                last = cursor;
            }
            None => {
                cursor += text[cursor..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }
    if last < text.len() {
        spans.push(Span::styled(text[last..].to_string(), base));
    }
    spans
}

/// Byte length of the prefix of `hay` that case-insensitively equals
/// `needle`, if any.
fn match_len_at(hay: &str, needle: &str) -> Option<usize> {
    let mut wanted = needle.chars().flat_map(char::to_lowercase).peekable();
    let mut consumed = 0;
    for c in hay.chars() {
        if wanted.peek().is_none() {
            break;
        }
        for lower in c.to_lowercase() {
            if wanted.next() != Some(lower) {
                return None;
            }
        }
        consumed += c.len_utf8();
    }
    (wanted.peek().is_none() && consumed > 0).then_some(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Modifier};

    fn texts(spans: &[Span]) -> Vec<String> {
        spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_highlight_without_needle_is_single_span() {
        let spans = highlight_spans("Hello", None, Style::default(), Style::default());
        assert_eq!(texts(&spans), vec!["Hello"]);
    }

    #[test]
    fn test_highlight_marks_every_match_case_insensitively() {
        let hl = Style::default().add_modifier(Modifier::BOLD);
        let spans = highlight_spans("Rust and rUST", Some("rust"), Style::default(), hl);
        assert_eq!(texts(&spans), vec!["Rust", " and ", "rUST"]);
        assert_eq!(spans[0].style, hl);
        assert_eq!(spans[1].style, Style::default());
    }

    #[test]
    fn test_highlight_handles_multibyte_text() {
        let hl = Style::default().fg(Color::Yellow);
        let spans = highlight_spans("Café crème", Some("CRÈ"), Style::default(), hl);
        assert_eq!(texts(&spans), vec!["Café ", "crè", "me"]);
    }

    #[test]
    fn test_highlight_partial_tail_does_not_match() {
        let spans = highlight_spans("tax", Some("taxes"), Style::default(), Style::default());
        assert_eq!(texts(&spans), vec!["tax"]);
    }
}
