use crate::app::App;
use crate::keybindings::{Action, Context};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

const LIST_HINTS: &[Action] = &[
    Action::NavDown,
    Action::OpenPost,
    Action::FocusSearch,
    Action::NewPost,
    Action::EditPost,
    Action::DeletePost,
    Action::CycleSort,
    Action::Refresh,
    Action::ToggleTheme,
    Action::Quit,
];

const DETAIL_HINTS: &[Action] = &[
    Action::ScrollDown,
    Action::PageDown,
    Action::SwitchFocus,
    Action::EditPost,
    Action::DeletePost,
    Action::OpenCover,
    Action::Back,
    Action::Quit,
];

const SEARCH_HINTS: &[Action] = &[Action::CommitSearch, Action::ExitSearch, Action::NavDown];

const FORM_HINTS: &[Action] = &[
    Action::SubmitForm,
    Action::NextField,
    Action::PrevField,
    Action::ToggleCoverMode,
    Action::CancelForm,
];

const CONFIRM_HINTS: &[Action] = &[Action::ConfirmDelete, Action::CancelDelete];

/// Render the status bar: the current message, else key hints.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let (text, style): (Cow<'_, str>, _) = match &app.status_message {
        Some((msg, _)) => (Cow::Borrowed(msg.as_ref()), app.style("status_notice")),
        None => (Cow::Owned(key_hints(app)), app.style("status_bar")),
    };

    f.render_widget(Paragraph::new(text).style(style), area);
}

/// Hints built from the live bindings, so overrides show up here too.
fn key_hints(app: &App) -> String {
    let context = app.key_context();
    let actions = match context {
        Context::Global | Context::PostList => LIST_HINTS,
        Context::Detail => DETAIL_HINTS,
        Context::Search => SEARCH_HINTS,
        Context::Form => FORM_HINTS,
        Context::Confirm => CONFIRM_HINTS,
    };

    let hints: Vec<String> = actions
        .iter()
        .filter_map(|&action| {
            let key = app.keybindings.key_hint(context, action).or_else(|| {
                context
                    .inherits_global()
                    .then(|| app.keybindings.key_hint(Context::Global, action))
                    .flatten()
            })?;
            Some(format!("[{}] {}", key, action.describe()))
        })
        .collect();

    format!(" {}", hints.join("  "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BlogClient, BlogQueries};
    use crate::app::Modal;
    use crate::config::Config;
    use crate::form::PostForm;
    use crate::storage::MemoryStore;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn app_with(overrides: HashMap<String, String>) -> App {
        let client = BlogClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let queries = BlogQueries::new(client, Duration::from_secs(300), 8);
        let config = Config {
            keybindings: overrides,
            ..Config::default()
        };
        App::new(queries, Arc::new(MemoryStore::new()), &config)
    }

    #[test]
    fn test_list_hints_use_default_keys() {
        let app = app_with(HashMap::new());
        let hints = key_hints(&app);
        assert!(hints.contains("[↓] next"), "{hints}");
        assert!(hints.contains("[q] quit"), "{hints}");
    }

    #[test]
    fn test_hints_follow_overrides() {
        let app = app_with([("quit".to_string(), "F10".to_string())].into());
        assert!(key_hints(&app).contains("[F10] quit"));
    }

    #[test]
    fn test_form_hints_in_form_context() {
        let mut app = app_with(HashMap::new());
        app.modal = Some(Modal::Form(PostForm::create()));
        let hints = key_hints(&app);
        assert!(hints.contains("save"));
        assert!(!hints.contains("quit"));
    }
}
