//! Keybinding registry: maps key events to actions, with config overrides.
//!
//! Bindings are looked up per context. Browsing contexts fall back to the
//! global table; modal contexts (search, form, confirm) only see their own
//! bindings so typed text never triggers a global shortcut.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

use crate::api::Category;

// ============================================================================
// Action Enum
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    SwitchFocus,
    Back,
    OpenPost,
    FocusSearch,
    NewPost,
    ToggleTheme,
    EditPost,
    DeletePost,
    /// Toggle the category at this index of `Category::ALL`.
    ToggleCategory(u8),
    ClearCategories,
    CycleSort,
    Refresh,
    OpenCover,
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    ExitSearch,
    CommitSearch,
    SubmitForm,
    CancelForm,
    NextField,
    PrevField,
    ToggleCoverMode,
    ConfirmDelete,
    CancelDelete,
}

impl Action {
    /// Short label used in the status bar key hints.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::NavDown => "next",
            Self::NavUp => "prev",
            Self::SwitchFocus => "focus",
            Self::Back => "back",
            Self::OpenPost => "open",
            Self::FocusSearch => "search",
            Self::NewPost => "new",
            Self::ToggleTheme => "theme",
            Self::EditPost => "edit",
            Self::DeletePost => "delete",
            Self::ToggleCategory(_) => "category",
            Self::ClearCategories => "all categories",
            Self::CycleSort => "sort",
            Self::Refresh => "refresh",
            Self::OpenCover => "open cover",
            Self::ScrollDown => "scroll down",
            Self::ScrollUp => "scroll up",
            Self::PageDown => "page down",
            Self::PageUp => "page up",
            Self::ExitSearch => "clear",
            Self::CommitSearch => "apply",
            Self::SubmitForm => "save",
            Self::CancelForm => "cancel",
            Self::NextField => "next field",
            Self::PrevField => "prev field",
            Self::ToggleCoverMode => "url/upload",
            Self::ConfirmDelete => "confirm",
            Self::CancelDelete => "cancel",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    PostList,
    Detail,
    Search,
    Form,
    Confirm,
}

impl Context {
    /// Whether unmatched keys fall through to the global table.
    pub fn inherits_global(self) -> bool {
        matches!(self, Context::Global | Context::PostList | Context::Detail)
    }
}

// ============================================================================
// Key Specification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Terminals report Shift on upper-case letters and BackTab
    /// inconsistently; the character itself already carries it.
    fn normalized(self) -> Self {
        match self.code {
            KeyCode::Char(_) | KeyCode::BackTab if self.modifiers == KeyModifiers::SHIFT => {
                Self::plain(self.code)
            }
            _ => self,
        }
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "/"
/// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "PageUp", "Backspace"
/// - Modifier combos: "Ctrl+d", "Ctrl+k"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeySpec::ctrl(c.to_ascii_lowercase())),
            _ => None,
        };
    }

    let named = match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "backtab" | "shift+tab" => Some(KeyCode::BackTab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "pageup" | "pgup" => Some(KeyCode::PageUp),
        "pagedown" | "pgdn" => Some(KeyCode::PageDown),
        "backspace" => Some(KeyCode::Backspace),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|n| n.parse::<u8>().ok())
    {
        return (1..=12).contains(&n).then(|| KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeySpec::plain(KeyCode::Char(c))),
        _ => None,
    }
}

/// Format a KeySpec for key hints.
pub fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "Shift+Tab".to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::PageUp => "PgUp".to_string(),
        KeyCode::PageDown => "PgDn".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Keybinding Registry
// ============================================================================

pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// Registration order, used for hints and for rebinding on override.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn bind_char(&mut self, context: Context, c: char, action: Action) {
        self.bind(context, KeySpec::plain(KeyCode::Char(c)), action);
    }

    fn register_defaults(&mut self) {
        use Context::*;

        // === Browsing ===
        self.bind(Global, KeySpec::ctrl('k'), Action::FocusSearch);
        self.bind_char(Global, '/', Action::FocusSearch);
        self.bind(Global, KeySpec::ctrl('n'), Action::NewPost);
        self.bind_char(Global, 'n', Action::NewPost);
        self.bind(Global, KeySpec::ctrl('d'), Action::ToggleTheme);
        self.bind(Global, KeySpec::plain(KeyCode::Esc), Action::Back);

        self.bind(Global, KeySpec::plain(KeyCode::Down), Action::NavDown);
        self.bind_char(Global, 'j', Action::NavDown);
        self.bind(Global, KeySpec::plain(KeyCode::Up), Action::NavUp);
        self.bind_char(Global, 'k', Action::NavUp);
        self.bind(Global, KeySpec::plain(KeyCode::Enter), Action::OpenPost);
        self.bind(Global, KeySpec::plain(KeyCode::Tab), Action::SwitchFocus);

        self.bind_char(Global, 'e', Action::EditPost);
        self.bind_char(Global, 'd', Action::DeletePost);
        self.bind_char(Global, 'o', Action::OpenCover);
        self.bind_char(Global, 'r', Action::Refresh);
        self.bind_char(Global, 's', Action::CycleSort);
        self.bind_char(Global, '0', Action::ClearCategories);
        for (i, digit) in ('1'..='6').enumerate().take(Category::ALL.len()) {
            self.bind_char(Global, digit, Action::ToggleCategory(i as u8));
        }

        self.bind(Global, KeySpec::plain(KeyCode::PageDown), Action::PageDown);
        self.bind(Global, KeySpec::plain(KeyCode::PageUp), Action::PageUp);
        self.bind_char(Global, 'q', Action::Quit);

        // === Detail pane focused: line keys scroll instead of navigating ===
        self.bind(Detail, KeySpec::plain(KeyCode::Down), Action::ScrollDown);
        self.bind_char(Detail, 'j', Action::ScrollDown);
        self.bind(Detail, KeySpec::plain(KeyCode::Up), Action::ScrollUp);
        self.bind_char(Detail, 'k', Action::ScrollUp);

        // === Search field ===
        self.bind(Search, KeySpec::plain(KeyCode::Esc), Action::ExitSearch);
        self.bind(Search, KeySpec::plain(KeyCode::Enter), Action::CommitSearch);
        self.bind(Search, KeySpec::plain(KeyCode::Down), Action::NavDown);
        self.bind(Search, KeySpec::plain(KeyCode::Up), Action::NavUp);

        // === Authoring form ===
        self.bind(Form, KeySpec::ctrl('s'), Action::SubmitForm);
        self.bind(Form, KeySpec::plain(KeyCode::Esc), Action::CancelForm);
        self.bind(Form, KeySpec::plain(KeyCode::Tab), Action::NextField);
        self.bind(Form, KeySpec::plain(KeyCode::BackTab), Action::PrevField);
        self.bind(Form, KeySpec::ctrl('u'), Action::ToggleCoverMode);

        // === Delete confirmation ===
        self.bind_char(Confirm, 'y', Action::ConfirmDelete);
        self.bind_char(Confirm, 'n', Action::CancelDelete);
        self.bind(Confirm, KeySpec::plain(KeyCode::Esc), Action::CancelDelete);
    }

    /// Apply user overrides from the config `[keybindings]` table.
    ///
    /// Keys are action names ("quit", "focus_search"), values are key strings
    /// ("q", "Ctrl+k", "F5"). An override replaces every default key of that
    /// action in every context it was bound in.
    ///
    /// Returns warnings for unknown action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };

            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(
                action = %action_name,
                key = %key_str,
                "Applied keybinding override"
            );
        }

        warnings
    }

    /// Look up the action for a key in `context`, falling back to the global
    /// table for browsing contexts.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers).normalized();

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }

        if context != Context::Global && context.inherits_global() {
            return self.lookup.get(&(Context::Global, key)).copied();
        }

        None
    }

    /// Display string of the first key bound to `action` in `context`.
    pub fn key_hint(&self, context: Context, action: Action) -> Option<String> {
        self.bindings
            .iter()
            .find(|(c, _, a)| *c == context && *a == action)
            .map(|(_, key, _)| format_key(key))
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name from config.
fn parse_action_name(name: &str) -> Option<Action> {
    let name = name.to_lowercase();
    if let Some(n) = name.strip_prefix("toggle_category_") {
        let index = n.parse::<usize>().ok()?.checked_sub(1)?;
        return (index < Category::ALL.len()).then_some(Action::ToggleCategory(index as u8));
    }

    match name.as_str() {
        "quit" => Some(Action::Quit),
        "nav_down" | "down" | "next" => Some(Action::NavDown),
        "nav_up" | "up" | "prev" => Some(Action::NavUp),
        "switch_focus" | "focus" => Some(Action::SwitchFocus),
        "back" => Some(Action::Back),
        "open_post" | "open" | "select" => Some(Action::OpenPost),
        "focus_search" | "search" => Some(Action::FocusSearch),
        "new_post" | "new" => Some(Action::NewPost),
        "toggle_theme" | "theme" => Some(Action::ToggleTheme),
        "edit_post" | "edit" => Some(Action::EditPost),
        "delete_post" | "delete" => Some(Action::DeletePost),
        "clear_categories" => Some(Action::ClearCategories),
        "cycle_sort" | "sort" => Some(Action::CycleSort),
        "refresh" => Some(Action::Refresh),
        "open_cover" => Some(Action::OpenCover),
        "scroll_down" => Some(Action::ScrollDown),
        "scroll_up" => Some(Action::ScrollUp),
        "page_down" => Some(Action::PageDown),
        "page_up" => Some(Action::PageUp),
        "exit_search" => Some(Action::ExitSearch),
        "commit_search" => Some(Action::CommitSearch),
        "submit_form" | "save" => Some(Action::SubmitForm),
        "cancel_form" => Some(Action::CancelForm),
        "next_field" => Some(Action::NextField),
        "prev_field" => Some(Action::PrevField),
        "toggle_cover_mode" => Some(Action::ToggleCoverMode),
        "confirm_delete" => Some(Action::ConfirmDelete),
        "cancel_delete" => Some(Action::CancelDelete),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(reg: &KeybindingRegistry, key: KeySpec, ctx: Context) -> Option<Action> {
        reg.action_for_key(key.code, key.modifiers, ctx)
    }

    #[test]
    fn test_default_shortcuts() {
        let reg = KeybindingRegistry::new();
        let g = Context::PostList;
        assert_eq!(lookup(&reg, KeySpec::ctrl('k'), g), Some(Action::FocusSearch));
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('/')), g), Some(Action::FocusSearch));
        assert_eq!(lookup(&reg, KeySpec::ctrl('n'), g), Some(Action::NewPost));
        assert_eq!(lookup(&reg, KeySpec::ctrl('d'), g), Some(Action::ToggleTheme));
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Esc), g), Some(Action::Back));
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('q')), g), Some(Action::Quit));
    }

    #[test]
    fn test_navigation_keys() {
        let reg = KeybindingRegistry::new();
        let g = Context::PostList;
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Down), g), Some(Action::NavDown));
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('j')), g), Some(Action::NavDown));
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Up), g), Some(Action::NavUp));
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('k')), g), Some(Action::NavUp));
    }

    #[test]
    fn test_category_digits() {
        let reg = KeybindingRegistry::new();
        let g = Context::PostList;
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('1')), g),
            Some(Action::ToggleCategory(0))
        );
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('6')), g),
            Some(Action::ToggleCategory(5))
        );
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('7')), g), None);
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('0')), g),
            Some(Action::ClearCategories)
        );
    }

    #[test]
    fn test_detail_context_scrolls() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('j')), Context::Detail),
            Some(Action::ScrollDown)
        );
        // Unbound in Detail, found in Global.
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('e')), Context::Detail),
            Some(Action::EditPost)
        );
    }

    #[test]
    fn test_modal_contexts_do_not_inherit_global() {
        let reg = KeybindingRegistry::new();
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('q')), Context::Search), None);
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('q')), Context::Form), None);
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('d')), Context::Confirm), None);
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Esc), Context::Search),
            Some(Action::ExitSearch)
        );
        assert_eq!(lookup(&reg, KeySpec::ctrl('s'), Context::Form), Some(Action::SubmitForm));
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('y')), Context::Confirm),
            Some(Action::ConfirmDelete)
        );
    }

    #[test]
    fn test_shift_is_normalized() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            reg.action_for_key(KeyCode::BackTab, KeyModifiers::SHIFT, Context::Form),
            Some(Action::PrevField)
        );
        assert_eq!(
            reg.action_for_key(KeyCode::Char('/'), KeyModifiers::SHIFT, Context::PostList),
            Some(Action::FocusSearch)
        );
    }

    #[test]
    fn test_apply_overrides_valid() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([("focus_search".to_string(), "F3".to_string())]);

        assert!(reg.apply_overrides(&overrides).is_empty());
        assert_eq!(lookup(&reg, KeySpec::ctrl('k'), Context::Global), None);
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('/')), Context::Global), None);
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::F(3)), Context::Global),
            Some(Action::FocusSearch)
        );
    }

    #[test]
    fn test_override_keeps_contexts() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([("scroll_down".to_string(), "l".to_string())]);
        reg.apply_overrides(&overrides);
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('l')), Context::Detail),
            Some(Action::ScrollDown)
        );
        assert_eq!(lookup(&reg, KeySpec::plain(KeyCode::Char('l')), Context::Global), None);
        // Detail 'j' now falls through to global navigation.
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('j')), Context::Detail),
            Some(Action::NavDown)
        );
    }

    #[test]
    fn test_override_category_by_number() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([("toggle_category_2".to_string(), "t".to_string())]);
        assert!(reg.apply_overrides(&overrides).is_empty());
        assert_eq!(
            lookup(&reg, KeySpec::plain(KeyCode::Char('t')), Context::Global),
            Some(Action::ToggleCategory(1))
        );
    }

    #[test]
    fn test_apply_overrides_warnings() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([
            ("nonexistent_action".to_string(), "q".to_string()),
            ("quit".to_string(), "Ctrl+Alt+Q".to_string()),
            ("toggle_category_9".to_string(), "x".to_string()),
        ]);
        let warnings = reg.apply_overrides(&overrides);
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("Cannot parse key")));
        assert_eq!(warnings.iter().filter(|w| w.contains("Unknown action")).count(), 2);
    }

    #[test]
    fn test_parse_key_string() {
        assert_eq!(parse_key_string("Enter"), Some(KeySpec::plain(KeyCode::Enter)));
        assert_eq!(parse_key_string("pageup"), Some(KeySpec::plain(KeyCode::PageUp)));
        assert_eq!(parse_key_string("Ctrl+K"), Some(KeySpec::ctrl('k')));
        assert_eq!(parse_key_string("F12"), Some(KeySpec::plain(KeyCode::F(12))));
        assert_eq!(parse_key_string("F13"), None);
        assert_eq!(parse_key_string("é"), Some(KeySpec::plain(KeyCode::Char('é'))));
        assert_eq!(parse_key_string("ab"), None);
    }

    #[test]
    fn test_key_hint_uses_first_binding() {
        let reg = KeybindingRegistry::new();
        assert_eq!(
            reg.key_hint(Context::Global, Action::FocusSearch).as_deref(),
            Some("Ctrl+k")
        );
        assert_eq!(reg.key_hint(Context::Form, Action::SubmitForm).as_deref(), Some("Ctrl+s"));
        assert_eq!(reg.key_hint(Context::Search, Action::Quit), None);
    }
}
