use crate::api::{BlogQueries, Category, GatewayError, Post};
use crate::config::Config;
use crate::form::PostForm;
use crate::keybindings::{Context as KbContext, KeybindingRegistry};
use crate::pipeline::{visible_indices, BlogStats, PostFilter};
use crate::selection::{self, Direction, Selection};
use crate::storage::KeyValueStore;
use crate::theme::{StyleMap, ThemeVariant, THEME_KEY};
use crate::util::MAX_SEARCH_QUERY_LENGTH;
use ratatui::style::Style;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long a status message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(3);

// ============================================================================
// View State Enums
// ============================================================================

/// Which pane receives browsing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Detail,
}

/// Load state of the post list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    Ready,
    Failed(String),
}

/// What the detail pane shows for the current selection.
#[derive(Debug, Clone)]
pub enum DetailState {
    Empty,
    Loading { id: String },
    Loaded(Arc<Post>),
    NotFound { id: String },
    Failed { id: String, message: String },
}

impl DetailState {
    pub fn id(&self) -> Option<&str> {
        match self {
            DetailState::Empty => None,
            DetailState::Loading { id }
            | DetailState::NotFound { id }
            | DetailState::Failed { id, .. } => Some(id),
            DetailState::Loaded(post) => Some(&post.id),
        }
    }
}

/// Delete confirmation dialog.
#[derive(Debug, Clone)]
pub struct ConfirmDelete {
    pub id: String,
    pub title: String,
    pub pending: bool,
    pub error: Option<String>,
}

/// Overlay that captures all input while open.
#[derive(Debug, Clone)]
pub enum Modal {
    Form(PostForm),
    ConfirmDelete(ConfirmDelete),
}

/// What an Esc press did, innermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    ClosedModal,
    LeftSearch,
    ClearedSearch,
    ClearedSelection,
    Nothing,
}

// ============================================================================
// Events
// ============================================================================

/// Results of background tasks, delivered to the event loop.
#[derive(Debug)]
pub enum AppEvent {
    /// A list read finished. `generation` identifies the request so an older
    /// response never overwrites a newer one.
    PostsLoaded {
        generation: u64,
        result: Result<Arc<Vec<Post>>, GatewayError>,
    },
    PostLoaded {
        id: String,
        result: Result<Arc<Post>, GatewayError>,
    },
    PostCreated {
        post: Post,
    },
    PostCreateFailed {
        error: GatewayError,
    },
    PostUpdated {
        post: Post,
    },
    PostUpdateFailed {
        id: String,
        error: GatewayError,
    },
    PostDeleted {
        id: String,
    },
    PostDeleteFailed {
        id: String,
        error: GatewayError,
    },
    /// A background task panicked.
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state.
///
/// The visible list is derived state: every change to the collection or to
/// `filter` goes through [`App::recompute`].
pub struct App {
    pub queries: BlogQueries,
    pub store: Arc<dyn KeyValueStore>,

    // Theme
    pub theme_variant: ThemeVariant,
    pub theme: StyleMap,
    pub keybindings: KeybindingRegistry,

    // Data
    /// Last known collection, in service order.
    pub posts: Arc<Vec<Post>>,
    /// Indices into `posts` of the visible entries, in display order.
    pub visible: Vec<usize>,
    pub filter: PostFilter,
    pub list_state: ListState,
    /// Cache revision `posts` was taken from.
    pub posts_revision: u64,
    /// Bumped per list request; stale responses are dropped.
    pub list_generation: u64,
    /// Whether the restored selection has been checked against a loaded list.
    pub selection_checked: bool,

    // Selection and detail
    pub selection: Selection,
    pub detail: DetailState,
    pub detail_scroll: usize,
    /// Viewport and content heights from the last render, for progress.
    pub detail_visible_lines: usize,
    pub detail_total_lines: usize,

    // UI state
    pub focus: Focus,
    pub modal: Option<Modal>,
    pub search_mode: bool,
    pub search_input: String,
    /// Time of the last search keystroke not yet applied.
    pub search_debounce: Option<Instant>,
    pub debounce: Duration,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub spinner_frame: usize,
}

impl App {
    pub fn new(queries: BlogQueries, store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        let mut keybindings = KeybindingRegistry::new();
        let warnings = keybindings.apply_overrides(&config.keybindings);
        for warning in &warnings {
            tracing::warn!(warning = %warning, "Keybinding override rejected");
        }

        let theme_variant = ThemeVariant::from_str_name(&config.theme).unwrap_or_else(|| {
            tracing::warn!(theme = %config.theme, "Unknown theme in config, using dark");
            ThemeVariant::Dark
        });

        let mut app = Self {
            queries,
            store,
            theme_variant,
            theme: StyleMap::for_variant(theme_variant),
            keybindings,
            posts: Arc::new(Vec::new()),
            visible: Vec::new(),
            filter: PostFilter::default(),
            list_state: ListState::Loading,
            posts_revision: 0,
            list_generation: 0,
            selection_checked: false,
            selection: Selection::default(),
            detail: DetailState::Empty,
            detail_scroll: 0,
            detail_visible_lines: 0,
            detail_total_lines: 0,
            focus: Focus::List,
            modal: None,
            search_mode: false,
            search_input: String::new(),
            search_debounce: None,
            debounce: config.search_debounce(),
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
        };
        if let Some(first) = warnings.into_iter().next() {
            app.set_status(first);
        }
        app
    }

    /// Load the persisted selection and theme. Store failures are logged and
    /// leave the defaults in place.
    pub async fn restore_state(&mut self) {
        match selection::load(self.store.as_ref()).await {
            Ok(restored) => {
                if let Some(id) = restored.current() {
                    tracing::info!(post_id = %id, "Restored selection");
                }
                self.selection = restored;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to load saved selection"),
        }

        match self.store.get(THEME_KEY).await {
            Ok(Some(name)) => match ThemeVariant::from_str_name(&name) {
                Some(variant) => self.set_theme(variant),
                None => tracing::warn!(value = %name, "Ignoring unknown saved theme"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to load saved theme"),
        }
    }

    // ========================================================================
    // Theme
    // ========================================================================

    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    pub fn set_theme(&mut self, variant: ThemeVariant) {
        self.theme_variant = variant;
        self.theme = StyleMap::for_variant(variant);
        self.needs_redraw = true;
    }

    /// Switch Dark ↔ Light and return the new variant.
    pub fn toggle_theme(&mut self) -> ThemeVariant {
        let next = self.theme_variant.toggled();
        self.set_theme(next);
        next
    }

    // ========================================================================
    // Derived List
    // ========================================================================

    /// Rebuild `visible` from the collection and filter.
    ///
    /// Returns `true` when the visible sequence changed.
    pub fn recompute(&mut self) -> bool {
        let visible = visible_indices(&self.posts, &self.filter);
        let changed = visible != self.visible;
        if changed {
            tracing::debug!(
                visible = visible.len(),
                total = self.posts.len(),
                "Visible list changed"
            );
            self.visible = visible;
        }
        self.needs_redraw = true;
        changed
    }

    pub fn visible_posts(&self) -> impl Iterator<Item = &Post> {
        self.visible.iter().map(|&i| &self.posts[i])
    }

    pub fn visible_ids(&self) -> Vec<&str> {
        self.visible_posts().map(|p| p.id.as_str()).collect()
    }

    pub fn stats(&self) -> BlogStats {
        BlogStats {
            total: self.posts.len(),
            visible: self.visible.len(),
            filtered: self.filter.is_filtering(),
        }
    }

    /// Row of the selection in the visible list, if it is visible.
    pub fn selected_row(&self) -> Option<usize> {
        let id = self.selection.current()?;
        self.visible_posts().position(|p| p.id == id)
    }

    /// Selected post as known from the list (not the detail fetch).
    pub fn selected_post(&self) -> Option<&Post> {
        let id = self.selection.current()?;
        self.posts.iter().find(|p| p.id == id)
    }

    /// Post shown in the detail pane, preferring the detail fetch.
    pub fn open_post(&self) -> Option<Arc<Post>> {
        match &self.detail {
            DetailState::Loaded(post) => Some(Arc::clone(post)),
            _ => self.selected_post().cloned().map(Arc::new),
        }
    }

    /// Install a freshly loaded collection.
    ///
    /// The first load also drops a restored selection that no longer exists;
    /// returns `true` in that case so the caller can persist the change.
    pub fn set_posts(&mut self, posts: Arc<Vec<Post>>, revision: u64) -> bool {
        tracing::debug!(count = posts.len(), revision, "Installing post list");
        self.posts = posts;
        self.posts_revision = revision;
        self.list_state = ListState::Ready;
        self.recompute();

        if self.selection_checked {
            return false;
        }
        self.selection_checked = true;
        if self.selection.retain_existing(&self.posts) {
            self.detail = DetailState::Empty;
            return true;
        }
        false
    }

    /// Drop `id` from the local collection.
    ///
    /// Clears the selection when it pointed at `id`; returns `true` then.
    pub fn remove_post(&mut self, id: &str) -> bool {
        if self.posts.iter().any(|p| p.id == id) {
            self.posts = Arc::new(self.posts.iter().filter(|p| p.id != id).cloned().collect());
            self.recompute();
        }
        if self.detail.id() == Some(id) {
            self.detail = DetailState::Empty;
        }
        if self.selection.is_selected(id) {
            self.selection.clear();
            true
        } else {
            false
        }
    }

    /// Replace a post in place after an update.
    pub fn replace_post(&mut self, post: Post) {
        let post = Arc::new(post);
        if self.posts.iter().any(|p| p.id == post.id) {
            self.posts = Arc::new(
                self.posts
                    .iter()
                    .map(|p| if p.id == post.id { (*post).clone() } else { p.clone() })
                    .collect(),
            );
            self.recompute();
        }
        if self.detail.id() == Some(post.id.as_str()) {
            self.detail = DetailState::Loaded(post);
        }
    }

    // ========================================================================
    // Filters
    // ========================================================================

    pub fn toggle_category(&mut self, index: usize) -> Option<Category> {
        let category = *Category::ALL.get(index)?;
        self.filter.toggle_category(category);
        self.recompute();
        Some(category)
    }

    pub fn clear_categories(&mut self) {
        if !self.filter.categories.is_empty() {
            self.filter.categories.clear();
            self.recompute();
        }
    }

    pub fn cycle_sort(&mut self) -> &'static str {
        self.filter.sort = self.filter.sort.next();
        self.recompute();
        self.filter.sort.label()
    }

    // ========================================================================
    // Search
    // ========================================================================

    pub fn enter_search(&mut self) {
        self.search_mode = true;
        self.search_input = self.filter.search.clone();
        self.needs_redraw = true;
    }

    /// Append typed text; the filter picks it up after the quiet period.
    pub fn push_search_char(&mut self, c: char) {
        if self.search_input.chars().count() >= MAX_SEARCH_QUERY_LENGTH {
            self.set_status(format!(
                "Search query too long (max {} chars)",
                MAX_SEARCH_QUERY_LENGTH
            ));
            return;
        }
        self.search_input.push(c);
        self.search_debounce = Some(Instant::now());
    }

    pub fn pop_search_char(&mut self) {
        if self.search_input.pop().is_some() {
            self.search_debounce = Some(Instant::now());
        }
    }

    /// Apply the typed query now, skipping the remaining quiet period.
    pub fn commit_search(&mut self) {
        self.search_debounce = None;
        if self.filter.search != self.search_input {
            self.filter.search = self.search_input.clone();
            self.recompute();
        }
    }

    /// When the pending query becomes due, if one is pending.
    pub fn debounce_deadline(&self) -> Option<Instant> {
        self.search_debounce.map(|last| last + self.debounce)
    }

    /// Apply the typed query once it has been idle for the debounce
    /// period. Returns `true` when it was applied.
    pub fn tick_debounce(&mut self) -> bool {
        match self.search_debounce {
            Some(last) if last.elapsed() >= self.debounce => {
                self.commit_search();
                true
            }
            _ => false,
        }
    }

    /// Leave the search field and drop the query.
    pub fn exit_search(&mut self) {
        self.search_mode = false;
        self.search_input.clear();
        self.search_debounce = None;
        if !self.filter.search.is_empty() {
            self.filter.search.clear();
            self.recompute();
        }
        self.needs_redraw = true;
    }

    // ========================================================================
    // Selection and Detail
    // ========================================================================

    /// Move the selection through the visible list. Returns the new id.
    pub fn advance(&mut self, direction: Direction) -> Option<String> {
        let before = self.selection.current().map(str::to_string);
        let ids: Vec<String> = self.visible_posts().map(|p| p.id.clone()).collect();
        let after = self.selection.advance(direction, &ids).map(str::to_string);
        if after != before {
            self.detail_scroll = 0;
            self.needs_redraw = true;
        }
        after
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.selection.select(id);
        self.detail_scroll = 0;
        self.needs_redraw = true;
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.detail = DetailState::Empty;
        self.detail_scroll = 0;
        self.focus = Focus::List;
        self.needs_redraw = true;
    }

    /// Point the detail pane at the current selection.
    ///
    /// Shows a cached copy immediately when one exists. Returns the id to
    /// fetch, or `None` when nothing is selected.
    pub fn begin_detail_load(&mut self) -> Option<String> {
        let Some(id) = self.selection.current().map(str::to_string) else {
            self.detail = DetailState::Empty;
            return None;
        };
        if self.detail.id() != Some(id.as_str())
            || !matches!(self.detail, DetailState::Loaded(_))
        {
            self.detail = match self.queries.cached_post(&id) {
                Some(post) => DetailState::Loaded(post),
                None => DetailState::Loading { id: id.clone() },
            };
        }
        Some(id)
    }

    /// Apply a detail fetch result. Results for anything other than the
    /// current selection are dropped; returns whether it was applied.
    pub fn apply_post_loaded(&mut self, id: &str, result: Result<Arc<Post>, GatewayError>) -> bool {
        if !self.selection.is_selected(id) {
            tracing::debug!(post_id = %id, "Dropping detail for stale selection");
            return false;
        }
        self.detail = match result {
            Ok(post) => DetailState::Loaded(post),
            Err(e) if e.is_not_found() => DetailState::NotFound { id: id.to_string() },
            Err(e) => DetailState::Failed {
                id: id.to_string(),
                message: e.to_string(),
            },
        };
        self.needs_redraw = true;
        true
    }

    pub fn scroll_detail(&mut self, delta: isize) {
        let max = self
            .detail_total_lines
            .saturating_sub(self.detail_visible_lines.max(1));
        self.detail_scroll = self.detail_scroll.saturating_add_signed(delta).min(max);
        self.needs_redraw = true;
    }

    pub fn page_size(&self) -> isize {
        self.detail_visible_lines.saturating_sub(1).max(1) as isize
    }

    /// Share of the detail content scrolled past, as a percentage.
    pub fn reading_progress(&self) -> u16 {
        let visible = self.detail_visible_lines;
        let total = self.detail_total_lines;
        if total <= visible || total == 0 {
            return 100;
        }
        let seen = (self.detail_scroll + visible).min(total);
        ((seen * 100) / total) as u16
    }

    // ========================================================================
    // Context and Back
    // ========================================================================

    /// Keybinding context for the current state, innermost first.
    pub fn key_context(&self) -> KbContext {
        match (&self.modal, self.search_mode, self.focus) {
            (Some(Modal::Form(_)), _, _) => KbContext::Form,
            (Some(Modal::ConfirmDelete(_)), _, _) => KbContext::Confirm,
            (None, true, _) => KbContext::Search,
            (None, false, Focus::List) => KbContext::PostList,
            (None, false, Focus::Detail) => KbContext::Detail,
        }
    }

    /// Esc: close the modal, else leave or clear the search, else clear
    /// the selection.
    pub fn back(&mut self) -> BackOutcome {
        self.needs_redraw = true;
        if let Some(modal) = &self.modal {
            let busy = match modal {
                Modal::Form(form) => form.pending,
                Modal::ConfirmDelete(confirm) => confirm.pending,
            };
            if busy {
                return BackOutcome::Nothing;
            }
            self.modal = None;
            return BackOutcome::ClosedModal;
        }
        if self.search_mode {
            self.exit_search();
            return BackOutcome::LeftSearch;
        }
        if !self.filter.search.is_empty() {
            self.exit_search();
            return BackOutcome::ClearedSearch;
        }
        if self.focus == Focus::Detail {
            self.focus = Focus::List;
        }
        if self.selection.current().is_some() {
            self.clear_selection();
            return BackOutcome::ClearedSelection;
        }
        BackOutcome::Nothing
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Show a status message for a few seconds.
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear the status message once expired. Returns true if cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() >= STATUS_TTL {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}
