//! Background task spawning shared by input and event handling.
//!
//! Every task runs inside [`catch_task_panic`] and reports back through the
//! `AppEvent` channel. A dropped receiver is logged, never treated as fatal.

use crate::api::{BlogQueries, NewPost, PostPatch};
use crate::app::{App, AppEvent, ListState};
use crate::selection::{self, Selection};
use crate::storage::KeyValueStore;
use crate::theme::{ThemeVariant, THEME_KEY};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

/// Spawn `work` and forward the event it returns, turning a panic into
/// `AppEvent::TaskPanicked`.
fn spawn_reporting<F>(task: &'static str, tx: &mpsc::Sender<AppEvent>, work: F)
where
    F: Future<Output = AppEvent> + Send + 'static,
{
    let tx = tx.clone();
    tokio::spawn(async move {
        let event = match catch_task_panic(work).await {
            Ok(event) => event,
            Err(panic_msg) => {
                tracing::error!(task, error = %panic_msg, "Background task panicked");
                AppEvent::TaskPanicked {
                    task,
                    error: panic_msg,
                }
            }
        };
        if let Err(e) = tx.send(event).await {
            tracing::warn!(task, error = %e, "Channel send failed (receiver dropped)");
        }
    });
}

/// Read the post list through the cache.
///
/// Bumps the list generation so a slower, older response is ignored.
pub(super) fn spawn_list_load(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    app.list_generation = app.list_generation.wrapping_add(1);
    let generation = app.list_generation;
    if app.posts.is_empty() {
        app.list_state = ListState::Loading;
    }
    let queries = app.queries.clone();
    tracing::debug!(generation, "Spawning list load");
    spawn_reporting("list_load", tx, async move {
        AppEvent::PostsLoaded {
            generation,
            result: queries.list_posts().await,
        }
    });
}

/// Point the detail pane at the selection and fetch it if needed.
pub(super) fn spawn_detail_load(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let Some(id) = app.begin_detail_load() else {
        return;
    };
    let queries = app.queries.clone();
    spawn_reporting("post_load", tx, async move {
        let result = queries.get_post(&id).await;
        AppEvent::PostLoaded { id, result }
    });
}

pub(super) fn spawn_create(queries: BlogQueries, input: NewPost, tx: &mpsc::Sender<AppEvent>) {
    spawn_reporting("create_post", tx, async move {
        match queries.create_post(&input).await {
            Ok(post) => AppEvent::PostCreated { post },
            Err(error) => AppEvent::PostCreateFailed { error },
        }
    });
}

pub(super) fn spawn_update(
    queries: BlogQueries,
    id: String,
    patch: PostPatch,
    tx: &mpsc::Sender<AppEvent>,
) {
    spawn_reporting("update_post", tx, async move {
        match queries.update_post(&id, &patch).await {
            Ok(post) => AppEvent::PostUpdated { post },
            Err(error) => AppEvent::PostUpdateFailed { id, error },
        }
    });
}

pub(super) fn spawn_delete(queries: BlogQueries, id: String, tx: &mpsc::Sender<AppEvent>) {
    spawn_reporting("delete_post", tx, async move {
        match queries.delete_post(&id).await {
            Ok(()) => AppEvent::PostDeleted { id },
            Err(error) => AppEvent::PostDeleteFailed { id, error },
        }
    });
}

/// Persist the selection in the background. Failures are logged only.
pub(super) fn spawn_save_selection(store: Arc<dyn KeyValueStore>, selection: Selection) {
    tokio::spawn(async move {
        match catch_task_panic(selection::save(store.as_ref(), &selection)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to save selection"),
            Err(panic_msg) => {
                tracing::error!(task = "save_selection", error = %panic_msg, "Background task panicked")
            }
        }
    });
}

pub(super) fn spawn_save_theme(store: Arc<dyn KeyValueStore>, variant: ThemeVariant) {
    tokio::spawn(async move {
        match catch_task_panic(store.set(THEME_KEY, variant.key())).await {
            Ok(Ok(())) => tracing::debug!(theme = variant.key(), "Saved theme"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to save theme"),
            Err(panic_msg) => {
                tracing::error!(task = "save_theme", error = %panic_msg, "Background task panicked")
            }
        }
    });
}

/// Selection changed: persist it and follow it in the detail pane.
pub(super) fn selection_changed(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    spawn_save_selection(Arc::clone(&app.store), app.selection.clone());
    spawn_detail_load(app, tx);
}
