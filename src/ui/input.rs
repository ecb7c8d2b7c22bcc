//! Keyboard input handling.
//!
//! Keys resolve to actions through the keybinding registry for the current
//! context. Keys with no binding fall through to text entry in the search
//! field and the authoring form.

use crate::app::{App, AppEvent, BackOutcome, ConfirmDelete, Focus, Modal};
use crate::form::{FormField, PostForm, Submission, ToggleOutcome, MAX_CATEGORIES};
use crate::keybindings::{Action as KeyAction, Context as KbContext};
use crate::selection::Direction;
use crate::util::{parse_http_url, strip_control_chars};
use anyhow::Result;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyModifiers};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::helpers::{
    selection_changed, spawn_create, spawn_delete, spawn_detail_load, spawn_list_load,
    spawn_save_selection, spawn_save_theme, spawn_update,
};
use super::Action;

/// Handle a key press.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    let context = app.key_context();
    let action = app.keybindings.action_for_key(code, modifiers, context);

    match context {
        KbContext::Form => handle_form_input(app, action, code, modifiers, event_tx),
        KbContext::Confirm => handle_confirm_input(app, action, event_tx),
        KbContext::Search => handle_search_input(app, action, code, modifiers, event_tx),
        KbContext::Global | KbContext::PostList | KbContext::Detail => {
            return handle_browse_action(app, action, event_tx);
        }
    }
    Ok(Action::Continue)
}

/// Plain typed character, without Ctrl or Alt.
fn typed_char(code: KeyCode, modifiers: KeyModifiers) -> Option<char> {
    match code {
        KeyCode::Char(c) if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            Some(c)
        }
        _ => None,
    }
}

// ============================================================================
// Browsing
// ============================================================================

fn handle_browse_action(
    app: &mut App,
    action: Option<KeyAction>,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    let Some(action) = action else {
        return Ok(Action::Continue);
    };

    match action {
        KeyAction::Quit => return Ok(Action::Quit),
        KeyAction::NavDown => navigate(app, Direction::Forward, event_tx),
        KeyAction::NavUp => navigate(app, Direction::Backward, event_tx),
        KeyAction::SwitchFocus => {
            app.focus = match app.focus {
                Focus::List => Focus::Detail,
                Focus::Detail => Focus::List,
            };
        }
        KeyAction::Back => {
            if app.back() == BackOutcome::ClearedSelection {
                spawn_save_selection(Arc::clone(&app.store), app.selection.clone());
            }
        }
        KeyAction::OpenPost => {
            if app.selection.current().is_some() {
                app.focus = Focus::Detail;
                spawn_detail_load(app, event_tx);
            } else {
                app.set_status("No blog selected");
            }
        }
        KeyAction::FocusSearch => app.enter_search(),
        KeyAction::NewPost => {
            tracing::debug!("Opening create form");
            app.modal = Some(Modal::Form(PostForm::create()));
        }
        KeyAction::ToggleTheme => {
            let variant = app.toggle_theme();
            spawn_save_theme(Arc::clone(&app.store), variant);
            app.set_status(format!("Theme: {}", variant.name()));
        }
        KeyAction::EditPost => match app.open_post() {
            Some(post) => {
                tracing::debug!(post_id = %post.id, "Opening edit form");
                app.modal = Some(Modal::Form(PostForm::edit(post)));
            }
            None => app.set_status("No blog selected"),
        },
        KeyAction::DeletePost => match app.open_post() {
            Some(post) => {
                app.modal = Some(Modal::ConfirmDelete(ConfirmDelete {
                    id: post.id.clone(),
                    title: strip_control_chars(&post.title).into_owned(),
                    pending: false,
                    error: None,
                }));
            }
            None => app.set_status("No blog selected"),
        },
        KeyAction::ToggleCategory(index) => {
            app.toggle_category(index as usize);
        }
        KeyAction::ClearCategories => app.clear_categories(),
        KeyAction::CycleSort => {
            let label = app.cycle_sort();
            app.set_status(format!("Sort: {}", label));
        }
        KeyAction::Refresh => {
            tracing::info!("Manual refresh");
            app.queries.invalidate_posts();
            spawn_list_load(app, event_tx);
            if app.selection.current().is_some() {
                spawn_detail_load(app, event_tx);
            }
            app.set_status("Refreshing...");
        }
        KeyAction::OpenCover => open_cover(app),
        KeyAction::ScrollDown => app.scroll_detail(1),
        KeyAction::ScrollUp => app.scroll_detail(-1),
        KeyAction::PageDown => {
            let page = app.page_size();
            app.scroll_detail(page);
        }
        KeyAction::PageUp => {
            let page = app.page_size();
            app.scroll_detail(-page);
        }
        other => tracing::debug!(action = ?other, "Action not handled while browsing"),
    }
    Ok(Action::Continue)
}

fn navigate(app: &mut App, direction: Direction, event_tx: &mpsc::Sender<AppEvent>) {
    let before = app.selection.current().map(str::to_string);
    let after = app.advance(direction);
    if after.is_some() && after != before {
        selection_changed(app, event_tx);
    }
}

fn open_cover(app: &mut App) {
    let Some(post) = app.open_post() else {
        app.set_status("No blog selected");
        return;
    };
    if post.has_embedded_cover() {
        app.set_status("Cover image is embedded; nothing to open");
        return;
    }
    match parse_http_url(&post.cover_image) {
        Ok(url) => match open::that(url.as_str()) {
            Ok(()) => {
                tracing::info!(url = %url, "Opened cover image");
                app.set_status("Opened cover image in browser");
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to open browser");
                app.set_status(format!("Failed to open browser: {}", e));
            }
        },
        Err(e) => app.set_status(format!("Cannot open cover: {}", e)),
    }
}

// ============================================================================
// Search Field
// ============================================================================

fn handle_search_input(
    app: &mut App,
    action: Option<KeyAction>,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match action {
        Some(KeyAction::ExitSearch) => app.exit_search(),
        Some(KeyAction::CommitSearch) => {
            app.commit_search();
            app.search_mode = false;
        }
        Some(KeyAction::NavDown) => navigate(app, Direction::Forward, event_tx),
        Some(KeyAction::NavUp) => navigate(app, Direction::Backward, event_tx),
        _ => {
            if let Some(c) = typed_char(code, modifiers) {
                app.push_search_char(c);
            } else if code == KeyCode::Backspace {
                app.pop_search_char();
            }
        }
    }
}

// ============================================================================
// Authoring Form
// ============================================================================

fn handle_form_input(
    app: &mut App,
    action: Option<KeyAction>,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match action {
        Some(KeyAction::SubmitForm) => submit_form(app, event_tx),
        Some(KeyAction::CancelForm) => {
            app.back();
        }
        Some(action) => {
            if let Some(Modal::Form(form)) = &mut app.modal {
                match action {
                    KeyAction::NextField => form.focus_next(),
                    KeyAction::PrevField => form.focus_prev(),
                    KeyAction::ToggleCoverMode => form.toggle_cover_mode(),
                    _ => {}
                }
            }
        }
        None => edit_form(app, code, modifiers),
    }
}

fn edit_form(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    let Some(Modal::Form(form)) = &mut app.modal else {
        return;
    };
    if form.pending {
        return;
    }

    if form.focus.is_text() {
        match code {
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter if form.focus == FormField::Content => form.insert_newline(),
            KeyCode::Enter => form.focus_next(),
            _ => {
                if let Some(c) = typed_char(code, modifiers) {
                    form.insert_char(c);
                }
            }
        }
        return;
    }

    let outcome = match code {
        KeyCode::Left => {
            form.move_category_cursor(false);
            None
        }
        KeyCode::Right => {
            form.move_category_cursor(true);
            None
        }
        KeyCode::Char(' ') | KeyCode::Enter => Some(form.toggle_cursor_category()),
        _ => None,
    };
    if outcome == Some(ToggleOutcome::AtLimit) {
        app.set_status(format!("Select at most {} categories", MAX_CATEGORIES));
    }
}

fn submit_form(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(Modal::Form(form)) = &mut app.modal else {
        return;
    };
    if form.pending {
        tracing::debug!("Ignoring submit while a save is pending");
        return;
    }

    match form.submit(Utc::now()) {
        None => app.set_status("Fix the highlighted fields"),
        Some(Submission::Unchanged) => {
            app.modal = None;
            app.set_status("No changes");
        }
        Some(Submission::Create(input)) => {
            form.pending = true;
            tracing::info!(title = %input.title, "Submitting new post");
            spawn_create(app.queries.clone(), input, event_tx);
        }
        Some(Submission::Update { id, patch }) => {
            form.pending = true;
            tracing::info!(post_id = %id, "Submitting post update");
            spawn_update(app.queries.clone(), id, patch, event_tx);
        }
    }
}

// ============================================================================
// Delete Confirmation
// ============================================================================

fn handle_confirm_input(
    app: &mut App,
    action: Option<KeyAction>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    match action {
        Some(KeyAction::ConfirmDelete) => {
            let Some(Modal::ConfirmDelete(confirm)) = &mut app.modal else {
                return;
            };
            if confirm.pending {
                return;
            }
            confirm.pending = true;
            confirm.error = None;
            tracing::info!(post_id = %confirm.id, "Deleting post");
            spawn_delete(app.queries.clone(), confirm.id.clone(), event_tx);
        }
        Some(KeyAction::CancelDelete) => {
            app.back();
        }
        _ => {}
    }
}
