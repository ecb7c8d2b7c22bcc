//! Application event handling.
//!
//! Applies background task results (list and detail reads, mutation
//! outcomes) to the application state.

use crate::api::GatewayError;
use crate::app::{App, AppEvent, ListState, Modal};
use crate::util::strip_control_chars;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::helpers::{selection_changed, spawn_list_load, spawn_save_selection};

/// Handle an event from a background task.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent, event_tx: &mpsc::Sender<AppEvent>) {
    app.needs_redraw = true;
    match event {
        AppEvent::PostsLoaded { generation, result } => {
            handle_posts_loaded(app, generation, result, event_tx);
        }
        AppEvent::PostLoaded { id, result } => {
            app.apply_post_loaded(&id, result);
        }
        AppEvent::PostCreated { post } => {
            tracing::info!(post_id = %post.id, title = %post.title, "Created post");
            app.modal = None;
            app.set_status(format!("Published \"{}\"", strip_control_chars(&post.title)));
            app.select(post.id);
            selection_changed(app, event_tx);
            spawn_list_load(app, event_tx);
        }
        AppEvent::PostCreateFailed { error } => {
            tracing::warn!(error = %error, "Create failed");
            form_failed(app, &error);
        }
        AppEvent::PostUpdated { post } => {
            tracing::info!(post_id = %post.id, "Updated post");
            app.modal = None;
            app.set_status("Changes saved");
            app.replace_post(post);
            spawn_list_load(app, event_tx);
        }
        AppEvent::PostUpdateFailed { id, error } => {
            tracing::warn!(post_id = %id, error = %error, "Update failed");
            form_failed(app, &error);
        }
        AppEvent::PostDeleted { id } => {
            tracing::info!(post_id = %id, "Deleted post");
            if matches!(&app.modal, Some(Modal::ConfirmDelete(c)) if c.id == id) {
                app.modal = None;
            }
            if app.remove_post(&id) {
                spawn_save_selection(Arc::clone(&app.store), app.selection.clone());
            }
            app.set_status("Blog deleted");
            spawn_list_load(app, event_tx);
        }
        AppEvent::PostDeleteFailed { id, error } => {
            tracing::warn!(post_id = %id, error = %error, "Delete failed");
            if let Some(Modal::ConfirmDelete(confirm)) = &mut app.modal {
                if confirm.id == id {
                    confirm.pending = false;
                    confirm.error = Some(error.to_string());
                }
            }
            app.set_status(format!("Delete failed: {}", error));
        }
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error, "Background task panicked");
            if let Some(Modal::Form(form)) = &mut app.modal {
                form.pending = false;
            }
            if let Some(Modal::ConfirmDelete(confirm)) = &mut app.modal {
                confirm.pending = false;
            }
            app.set_status(format!("Internal error in {} task", task));
        }
    }
}

fn handle_posts_loaded(
    app: &mut App,
    generation: u64,
    result: Result<Arc<Vec<crate::api::Post>>, GatewayError>,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if generation != app.list_generation {
        tracing::debug!(
            generation,
            current = app.list_generation,
            "Ignoring stale list response"
        );
        return;
    }
    match result {
        Ok(posts) => {
            tracing::info!(count = posts.len(), "Loaded posts");
            let revision = app.queries.posts_revision();
            if app.set_posts(posts, revision) {
                spawn_save_selection(Arc::clone(&app.store), app.selection.clone());
            } else if app.selection.current().is_some() && app.detail.id().is_none() {
                // Restored selection survived the first load; show it.
                selection_changed(app, event_tx);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load posts");
            let message = e.to_string();
            if app.posts.is_empty() {
                app.list_state = ListState::Failed(message.clone());
            }
            app.set_status(format!("Failed to load blogs: {} (r to retry)", message));
        }
    }
}

/// Mutation from the form failed: keep it open with the error visible.
fn form_failed(app: &mut App, error: &GatewayError) {
    let message = error.to_string();
    if let Some(Modal::Form(form)) = &mut app.modal {
        form.pending = false;
        form.submit_error = Some(message.clone());
    }
    app.set_status(format!("Save failed: {}", message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BlogClient, BlogQueries, Category, Post};
    use crate::app::{ConfirmDelete, DetailState};
    use crate::config::Config;
    use crate::form::PostForm;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn post(id: &str, title: &str) -> Post {
        Post {
            id: id.into(),
            title: title.into(),
            description: "A description long enough".into(),
            content: "Body".into(),
            cover_image: "https://example.com/c.png".into(),
            category: vec![Category::Tech],
            date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        }
    }

    fn test_app() -> App {
        let client = BlogClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let queries = BlogQueries::new(client, Duration::from_secs(300), 8);
        App::new(queries, Arc::new(MemoryStore::new()), &Config::default())
    }

    #[tokio::test]
    async fn test_stale_list_generation_is_ignored() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app();
        app.list_generation = 2;

        handle_app_event(
            &mut app,
            AppEvent::PostsLoaded {
                generation: 1,
                result: Ok(Arc::new(vec![post("1", "Old")])),
            },
            &tx,
        );
        assert!(app.posts.is_empty());
        assert_eq!(app.list_state, ListState::Loading);

        handle_app_event(
            &mut app,
            AppEvent::PostsLoaded {
                generation: 2,
                result: Ok(Arc::new(vec![post("1", "New")])),
            },
            &tx,
        );
        assert_eq!(app.posts[0].title, "New");
        assert_eq!(app.list_state, ListState::Ready);
    }

    #[tokio::test]
    async fn test_list_failure_without_data_shows_error_state() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app();
        handle_app_event(
            &mut app,
            AppEvent::PostsLoaded {
                generation: 0,
                result: Err(GatewayError::Timeout(1)),
            },
            &tx,
        );
        assert!(matches!(app.list_state, ListState::Failed(_)));
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_delete_success_clears_selection_and_modal() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app();
        app.set_posts(Arc::new(vec![post("1", "Alpha"), post("2", "Beta")]), 1);
        app.select("1");
        app.detail = DetailState::Loaded(Arc::new(post("1", "Alpha")));
        app.modal = Some(Modal::ConfirmDelete(ConfirmDelete {
            id: "1".into(),
            title: "Alpha".into(),
            pending: true,
            error: None,
        }));

        handle_app_event(&mut app, AppEvent::PostDeleted { id: "1".into() }, &tx);

        assert!(app.modal.is_none());
        assert_eq!(app.selection.current(), None);
        assert!(matches!(app.detail, DetailState::Empty));
        assert_eq!(app.visible_ids(), vec!["2"]);
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_dialog_open() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app();
        app.modal = Some(Modal::ConfirmDelete(ConfirmDelete {
            id: "1".into(),
            title: "Alpha".into(),
            pending: true,
            error: None,
        }));

        handle_app_event(
            &mut app,
            AppEvent::PostDeleteFailed {
                id: "1".into(),
                error: GatewayError::Status { status: 500 },
            },
            &tx,
        );

        match &app.modal {
            Some(Modal::ConfirmDelete(confirm)) => {
                assert!(!confirm.pending);
                assert!(confirm.error.is_some());
            }
            other => panic!("dialog closed: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_failure_keeps_form_open() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app();
        let mut form = PostForm::create();
        form.pending = true;
        app.modal = Some(Modal::Form(form));

        handle_app_event(
            &mut app,
            AppEvent::PostCreateFailed {
                error: GatewayError::Transport("connection refused".into()),
            },
            &tx,
        );

        match &app.modal {
            Some(Modal::Form(form)) => {
                assert!(!form.pending);
                assert!(form
                    .submit_error
                    .as_deref()
                    .is_some_and(|e| e.contains("connection refused")));
            }
            other => panic!("form closed: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_success_selects_new_post() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app();
        app.modal = Some(Modal::Form(PostForm::create()));

        handle_app_event(&mut app, AppEvent::PostCreated { post: post("9", "Fresh") }, &tx);

        assert!(app.modal.is_none());
        assert_eq!(app.selection.current(), Some("9"));
        assert!(matches!(app.detail, DetailState::Loading { .. }));
    }
}
