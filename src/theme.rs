//! Theme system for the TUI.
//!
//! Semantic color roles map to ratatui `Style` values. `ThemeVariant`
//! selects the Dark or Light palette and `StyleMap` resolves role names.

use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

/// Store key holding the chosen variant name.
pub const THEME_KEY: &str = "theme.variant";

// ============================================================================
// Theme Variant
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeVariant {
    #[default]
    Dark,
    Light,
}

impl ThemeVariant {
    /// Parse a variant name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Name as persisted and as accepted in the config file.
    pub fn key(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Post list --
    pub post_title: Style,
    pub post_selected: Style,
    pub post_meta: Style,
    pub post_match: Style,
    pub category_tag: Style,

    // -- Detail --
    pub detail_title: Style,
    pub detail_body: Style,
    pub detail_meta: Style,
    pub detail_error: Style,

    // -- Filters --
    pub filter_active: Style,
    pub filter_inactive: Style,

    // -- Form --
    pub form_label: Style,
    pub form_focused: Style,
    pub form_error: Style,

    // -- Chrome --
    pub search_input: Style,
    pub status_bar: Style,
    pub status_notice: Style,
    pub panel_border: Style,
    pub panel_border_focused: Style,
    pub modal_border: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            post_title: Style::default().add_modifier(Modifier::BOLD),
            post_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            post_meta: Style::default().fg(Color::Gray),
            post_match: Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            category_tag: Style::default().fg(Color::Cyan),

            detail_title: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            detail_body: Style::default(),
            detail_meta: Style::default().fg(Color::DarkGray),
            detail_error: Style::default().fg(Color::Red),

            filter_active: Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            filter_inactive: Style::default().fg(Color::Gray),

            form_label: Style::default().add_modifier(Modifier::BOLD),
            form_focused: Style::default().fg(Color::Yellow),
            form_error: Style::default().fg(Color::Red),

            search_input: Style::default().fg(Color::Yellow),
            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            status_notice: Style::default()
                .bg(Color::DarkGray)
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
            modal_border: Style::default().fg(Color::Yellow),
        }
    }

    fn light() -> Self {
        Self {
            post_title: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            post_selected: Style::default().bg(Color::Blue).fg(Color::White),
            post_meta: Style::default().fg(Color::DarkGray),
            post_match: Style::default()
                .fg(Color::White)
                .bg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            category_tag: Style::default().fg(Color::Blue),

            detail_title: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            detail_body: Style::default().fg(Color::Black),
            detail_meta: Style::default().fg(Color::DarkGray),
            detail_error: Style::default().fg(Color::Red),

            filter_active: Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            filter_inactive: Style::default().fg(Color::DarkGray),

            form_label: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            form_focused: Style::default().fg(Color::Magenta),
            form_error: Style::default().fg(Color::Red),

            search_input: Style::default().fg(Color::Magenta),
            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            status_notice: Style::default()
                .bg(Color::White)
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
            modal_border: Style::default().fg(Color::Magenta),
        }
    }
}

// ============================================================================
// Style Map
// ============================================================================

/// Role-name lookup built from a `ColorPalette`.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

const ROLE_NAMES: [&str; 20] = [
    "post_title",
    "post_selected",
    "post_meta",
    "post_match",
    "category_tag",
    "detail_title",
    "detail_body",
    "detail_meta",
    "detail_error",
    "filter_active",
    "filter_inactive",
    "form_label",
    "form_focused",
    "form_error",
    "search_input",
    "status_bar",
    "status_notice",
    "panel_border",
    "panel_border_focused",
    "modal_border",
];

impl StyleMap {
    pub fn from_palette(p: &ColorPalette) -> Self {
        let styles: [Style; 20] = [
            p.post_title,
            p.post_selected,
            p.post_meta,
            p.post_match,
            p.category_tag,
            p.detail_title,
            p.detail_body,
            p.detail_meta,
            p.detail_error,
            p.filter_active,
            p.filter_inactive,
            p.form_label,
            p.form_focused,
            p.form_error,
            p.search_input,
            p.status_bar,
            p.status_notice,
            p.panel_border,
            p.panel_border_focused,
            p.modal_border,
        ];

        let map = ROLE_NAMES.iter().copied().zip(styles).collect();
        Self { map }
    }

    pub fn for_variant(variant: ThemeVariant) -> Self {
        Self::from_palette(&variant.palette())
    }

    /// Style for `role`, or `Style::default()` for unknown roles.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_selection_and_focus() {
        let palette = ThemeVariant::Dark.palette();
        assert_eq!(
            palette.post_selected,
            Style::default().bg(Color::DarkGray).fg(Color::White)
        );
        assert_eq!(palette.panel_border_focused, Style::default().fg(Color::Cyan));
    }

    #[test]
    fn light_palette_differs_from_dark() {
        let dark = ThemeVariant::Dark.palette();
        let light = ThemeVariant::Light.palette();
        assert_ne!(dark.post_selected, light.post_selected);
        assert_ne!(dark.status_bar, light.status_bar);
    }

    #[test]
    fn variant_names_round_trip() {
        for variant in [ThemeVariant::Dark, ThemeVariant::Light] {
            assert_eq!(ThemeVariant::from_str_name(variant.key()), Some(variant));
        }
        assert_eq!(ThemeVariant::from_str_name("LIGHT "), Some(ThemeVariant::Light));
        assert_eq!(ThemeVariant::from_str_name("neon"), None);
        assert_eq!(ThemeVariant::Dark.toggled(), ThemeVariant::Light);
    }

    #[test]
    fn style_map_resolves_roles() {
        let palette = ThemeVariant::Light.palette();
        let sm = StyleMap::from_palette(&palette);
        assert_eq!(sm.resolve("post_match"), palette.post_match);
        assert_eq!(sm.resolve("form_error"), palette.form_error);
        assert_eq!(sm.resolve("nonexistent_role"), Style::default());
    }

    #[test]
    fn style_map_has_every_role() {
        let sm = StyleMap::for_variant(ThemeVariant::Dark);
        assert_eq!(sm.map.len(), ROLE_NAMES.len());
        for name in ROLE_NAMES {
            assert!(sm.map.contains_key(name), "Role '{}' missing", name);
        }
    }
}
