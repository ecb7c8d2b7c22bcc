use crate::api::Category;
use crate::app::App;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Rows used by the filter bar, borders included.
pub(super) const HEIGHT: u16 = 4;

/// Render the search field, category chips and sort order.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 3 || area.height < 3 {
        return;
    }

    let search_line = if app.search_mode {
        Line::from(vec![
            Span::styled("Search: ", app.style("form_label")),
            Span::styled(format!("{}_", app.search_input), app.style("search_input")),
        ])
    } else if app.filter.search.is_empty() {
        Line::from(Span::styled("/ or Ctrl+K to search", app.style("filter_inactive")))
    } else {
        Line::from(vec![
            Span::styled("Search: ", app.style("form_label")),
            Span::styled(app.filter.search.clone(), app.style("search_input")),
            Span::styled("  (Esc clears)", app.style("filter_inactive")),
        ])
    };

    let mut chips = Vec::with_capacity(Category::ALL.len() * 2 + 2);
    for (i, category) in Category::ALL.iter().enumerate() {
        let style = if app.filter.categories.contains(category) {
            app.style("filter_active")
        } else {
            app.style("filter_inactive")
        };
        chips.push(Span::styled(format!(" {} {} ", i + 1, category.label()), style));
        chips.push(Span::raw(" "));
    }
    chips.push(Span::styled(
        format!("│ Sort: {}", app.filter.sort.label()),
        app.style("post_meta"),
    ));

    let paragraph = Paragraph::new(vec![search_line, Line::from(chips)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.style("panel_border"))
            .title(" quire "),
    );
    f.render_widget(paragraph, area);
}
