//! Authoring form state for creating and editing posts.
//!
//! Validation is local and synchronous: a form that fails it never produces a
//! request. Upload-mode covers are read from disk at submit time and embedded
//! as `data:` URLs.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use crate::api::{Category, NewPost, Post, PostPatch};
use crate::util::parse_http_url;

pub const TITLE_MIN_CHARS: usize = 5;
pub const DESCRIPTION_MIN_CHARS: usize = 20;
pub const DESCRIPTION_MAX_CHARS: usize = 200;
pub const CONTENT_MIN_CHARS: usize = 50;
pub const MAX_CATEGORIES: usize = 3;
/// Upload-mode cover files larger than this are refused.
pub const MAX_COVER_BYTES: u64 = 2 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Title,
    Description,
    Cover,
    Content,
    Categories,
}

impl FormField {
    const ORDER: [FormField; 5] = [
        FormField::Title,
        FormField::Description,
        FormField::Cover,
        FormField::Content,
        FormField::Categories,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description",
            FormField::Cover => "Cover image",
            FormField::Content => "Content",
            FormField::Categories => "Categories",
        }
    }

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let len = Self::ORDER.len();
        Self::ORDER[(self.position() + len - 1) % len]
    }

    /// Fields that accept typed text.
    pub fn is_text(self) -> bool {
        !matches!(self, FormField::Categories)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverMode {
    /// The field holds a remote http(s) address.
    Url,
    /// The field holds a local file path to embed.
    Upload,
}

/// Per-field validation messages.
pub type FieldErrors = BTreeMap<FormField, String>;

/// Outcome of a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Create(NewPost),
    Update { id: String, patch: PostPatch },
    /// Edit with nothing changed; no request is needed.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Refused because the cap was already reached.
    AtLimit,
}

/// Validated, trimmed field values.
#[derive(Debug, Clone, PartialEq)]
struct Draft {
    title: String,
    description: String,
    cover_image: String,
    content: String,
    category: Vec<Category>,
}

#[derive(Debug, Clone)]
pub struct PostForm {
    /// Post being edited; `None` when creating.
    original: Option<Arc<Post>>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub cover_url: String,
    pub cover_path: String,
    pub cover_mode: CoverMode,
    categories: BTreeSet<Category>,
    pub focus: FormField,
    pub category_cursor: usize,
    pub errors: FieldErrors,
    /// A create/update request is outstanding.
    pub pending: bool,
    /// Last mutation failure, shown inline until the next submit.
    pub submit_error: Option<String>,
}

impl PostForm {
    pub fn create() -> Self {
        Self {
            original: None,
            title: String::new(),
            description: String::new(),
            content: String::new(),
            cover_url: String::new(),
            cover_path: String::new(),
            cover_mode: CoverMode::Url,
            categories: BTreeSet::new(),
            focus: FormField::Title,
            category_cursor: 0,
            errors: FieldErrors::new(),
            pending: false,
            submit_error: None,
        }
    }

    /// Pre-fill from `post`. An embedded cover starts in upload mode with a
    /// blank path, which keeps the existing image unless a file is chosen.
    pub fn edit(post: Arc<Post>) -> Self {
        let embedded = post.has_embedded_cover();
        Self {
            title: post.title.clone(),
            description: post.description.clone(),
            content: post.content.clone(),
            cover_url: if embedded {
                String::new()
            } else {
                post.cover_image.clone()
            },
            cover_mode: if embedded {
                CoverMode::Upload
            } else {
                CoverMode::Url
            },
            categories: post.category.iter().copied().collect(),
            original: Some(post),
            ..Self::create()
        }
    }

    pub fn is_edit(&self) -> bool {
        self.original.is_some()
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.original.as_deref().map(|p| p.id.as_str())
    }

    pub fn heading(&self) -> &'static str {
        if self.is_edit() { "Edit Blog" } else { "New Blog" }
    }

    pub fn is_selected(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    pub fn selected_count(&self) -> usize {
        self.categories.len()
    }

    pub fn error(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    // ========================================================================
    // Editing
    // ========================================================================

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Content => Some(&mut self.content),
            FormField::Cover => Some(match self.cover_mode {
                CoverMode::Url => &mut self.cover_url,
                CoverMode::Upload => &mut self.cover_path,
            }),
            FormField::Categories => None,
        }
    }

    /// Text currently shown in the cover field for its mode.
    pub fn cover_text(&self) -> &str {
        match self.cover_mode {
            CoverMode::Url => &self.cover_url,
            CoverMode::Upload => &self.cover_path,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        let field = self.focus;
        if let Some(text) = self.focused_text() {
            text.push(c);
            self.errors.remove(&field);
        }
    }

    /// Newlines are only meaningful in the content body.
    pub fn insert_newline(&mut self) {
        if self.focus == FormField::Content {
            self.insert_char('\n');
        }
    }

    pub fn backspace(&mut self) {
        let field = self.focus;
        if let Some(text) = self.focused_text() {
            text.pop();
            self.errors.remove(&field);
        }
    }

    pub fn toggle_cover_mode(&mut self) {
        self.cover_mode = match self.cover_mode {
            CoverMode::Url => CoverMode::Upload,
            CoverMode::Upload => CoverMode::Url,
        };
        self.errors.remove(&FormField::Cover);
    }

    pub fn move_category_cursor(&mut self, forward: bool) {
        let len = Category::ALL.len();
        self.category_cursor = if forward {
            (self.category_cursor + 1) % len
        } else {
            (self.category_cursor + len - 1) % len
        };
    }

    pub fn cursor_category(&self) -> Category {
        Category::ALL[self.category_cursor % Category::ALL.len()]
    }

    pub fn toggle_category(&mut self, category: Category) -> ToggleOutcome {
        let outcome = if self.categories.remove(&category) {
            ToggleOutcome::Removed
        } else if self.categories.len() >= MAX_CATEGORIES {
            return ToggleOutcome::AtLimit;
        } else {
            self.categories.insert(category);
            ToggleOutcome::Added
        };
        self.errors.remove(&FormField::Categories);
        outcome
    }

    pub fn toggle_cursor_category(&mut self) -> ToggleOutcome {
        self.toggle_category(self.cursor_category())
    }

    // ========================================================================
    // Submit
    // ========================================================================

    /// Validate and build the request. On failure the field errors are
    /// stored on the form and `None` is returned.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Option<Submission> {
        self.submit_error = None;
        match self.validate() {
            Ok(draft) => {
                self.errors.clear();
                Some(self.build(draft, now))
            }
            Err(errors) => {
                tracing::debug!(fields = errors.len(), "Form validation failed");
                self.errors = errors;
                None
            }
        }
    }

    fn validate(&self) -> Result<Draft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let title = self.title.trim();
        if title.chars().count() < TITLE_MIN_CHARS {
            errors.insert(
                FormField::Title,
                format!("Title must be at least {TITLE_MIN_CHARS} characters"),
            );
        }

        let description = self.description.trim();
        let description_len = description.chars().count();
        if description_len == 0 {
            errors.insert(FormField::Description, "Description is required".into());
        } else if description_len < DESCRIPTION_MIN_CHARS {
            errors.insert(
                FormField::Description,
                format!("Description must be at least {DESCRIPTION_MIN_CHARS} characters"),
            );
        } else if description_len > DESCRIPTION_MAX_CHARS {
            errors.insert(
                FormField::Description,
                format!("Description must be at most {DESCRIPTION_MAX_CHARS} characters"),
            );
        }

        let content = self.content.trim();
        if content.chars().count() < CONTENT_MIN_CHARS {
            errors.insert(
                FormField::Content,
                format!("Content must be at least {CONTENT_MIN_CHARS} characters"),
            );
        }

        if self.categories.is_empty() {
            errors.insert(FormField::Categories, "Select at least one category".into());
        } else if self.categories.len() > MAX_CATEGORIES {
            errors.insert(
                FormField::Categories,
                format!("Select at most {MAX_CATEGORIES} categories"),
            );
        }

        let cover = match self.resolve_cover() {
            Ok(cover) => Some(cover),
            Err(message) => {
                errors.insert(FormField::Cover, message);
                None
            }
        };

        match cover {
            Some(cover_image) if errors.is_empty() => Ok(Draft {
                title: title.to_string(),
                description: description.to_string(),
                cover_image,
                content: content.to_string(),
                category: self.categories.iter().copied().collect(),
            }),
            _ => Err(errors),
        }
    }

    fn resolve_cover(&self) -> Result<String, String> {
        match self.cover_mode {
            CoverMode::Url => {
                let raw = self.cover_url.trim();
                if raw.is_empty() {
                    return Err("Cover image is required".into());
                }
                parse_http_url(raw)
                    .map(|_| raw.to_string())
                    .map_err(|_| "Cover image must be a valid http(s) URL".into())
            }
            CoverMode::Upload => {
                let path = self.cover_path.trim();
                if path.is_empty() {
                    return match self.original.as_deref() {
                        Some(post) if post.has_embedded_cover() => Ok(post.cover_image.clone()),
                        _ => Err("Cover image is required".into()),
                    };
                }
                embed_image(Path::new(path))
            }
        }
    }

    fn build(&self, draft: Draft, now: DateTime<Utc>) -> Submission {
        let Some(original) = self.original.as_deref() else {
            return Submission::Create(NewPost {
                title: draft.title,
                description: draft.description,
                content: draft.content,
                cover_image: draft.cover_image,
                category: draft.category,
                date: now,
            });
        };

        let changed = |new: String, old: &str| (new != old).then_some(new);
        let old_categories: BTreeSet<Category> = original.category.iter().copied().collect();
        let new_categories: BTreeSet<Category> = draft.category.iter().copied().collect();

        let patch = PostPatch {
            title: changed(draft.title, &original.title),
            description: changed(draft.description, &original.description),
            content: changed(draft.content, &original.content),
            cover_image: changed(draft.cover_image, &original.cover_image),
            category: (new_categories != old_categories).then_some(draft.category),
        };

        if patch.is_empty() {
            Submission::Unchanged
        } else {
            Submission::Update {
                id: original.id.clone(),
                patch,
            }
        }
    }
}

/// Read `path` and encode it as a `data:<mime>;base64,` URL.
fn embed_image(path: &Path) -> Result<String, String> {
    let metadata =
        std::fs::metadata(path).map_err(|e| format!("Cannot read image file: {e}"))?;
    if metadata.len() > MAX_COVER_BYTES {
        return Err("Image must be 2MB or smaller".into());
    }

    let mime = mime_guess::from_path(path)
        .first()
        .filter(|m| m.type_() == mime_guess::mime::IMAGE)
        .ok_or_else(|| "File is not an image".to_string())?;

    let bytes = std::fs::read(path).map_err(|e| format!("Cannot read image file: {e}"))?;
    Ok(format!("data:{};base64,{}", mime.essence_str(), BASE64.encode(bytes)))
}
