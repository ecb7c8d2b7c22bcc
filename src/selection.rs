//! Which post is open, and sequential navigation over the visible list.

use anyhow::Result;

use crate::api::Post;
use crate::storage::KeyValueStore;

/// Store key holding the last selected post id as a JSON scalar.
pub const SELECTION_KEY: &str = "selection.post_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Currently selected post id, if any.
///
/// The id need not exist in the collection; the detail view reports that case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<String>,
}

impl Selection {
    pub fn new(current: Option<String>) -> Self {
        Self { current }
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.current.as_deref() == Some(id)
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.current = Some(id.into());
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Move to the neighbouring id in `visible`, wrapping at both ends.
    ///
    /// With no selection, or one that is not in `visible`, forward picks the
    /// first entry and backward the last. Returns the new selection; an empty
    /// list leaves the selection untouched.
    pub fn advance<S: AsRef<str>>(&mut self, direction: Direction, visible: &[S]) -> Option<&str> {
        let len = visible.len();
        if len == 0 {
            return self.current();
        }

        let position = self
            .current
            .as_deref()
            .and_then(|id| visible.iter().position(|v| v.as_ref() == id));

        let next = match (position, direction) {
            (Some(i), Direction::Forward) => (i + 1) % len,
            (Some(i), Direction::Backward) => (i + len - 1) % len,
            (None, Direction::Forward) => 0,
            (None, Direction::Backward) => len - 1,
        };

        self.current = Some(visible[next].as_ref().to_string());
        self.current()
    }

    /// Drop the selection if it does not name a post in `posts`.
    ///
    /// Returns `true` when the selection was cleared.
    pub fn retain_existing(&mut self, posts: &[Post]) -> bool {
        match self.current.as_deref() {
            Some(id) if !posts.iter().any(|p| p.id == id) => {
                tracing::debug!(post_id = %id, "Restored selection no longer exists");
                self.current = None;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Persistence
// ============================================================================

/// Load the persisted selection. Unreadable values count as no selection.
pub async fn load(store: &dyn KeyValueStore) -> Result<Selection> {
    let Some(raw) = store.get(SELECTION_KEY).await? else {
        return Ok(Selection::default());
    };
    match serde_json::from_str::<Option<String>>(&raw) {
        Ok(current) => Ok(Selection::new(current)),
        Err(e) => {
            tracing::warn!(value = %raw, error = %e, "Ignoring unreadable persisted selection");
            Ok(Selection::default())
        }
    }
}

/// Persist `selection` as `"<id>"` or `null`.
pub async fn save(store: &dyn KeyValueStore, selection: &Selection) -> Result<()> {
    let encoded = serde_json::to_string(&selection.current)?;
    store.set(SELECTION_KEY, &encoded).await
}
