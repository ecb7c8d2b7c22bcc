//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling per keybinding context
//! - `events` - Background task event processing
//! - `helpers` - Background task spawning and panic capture
//! - `render` - Layout and overlay dispatch
//! - `posts` - Post list panel
//! - `detail` - Detail pane with reading progress
//! - `filters` - Search field, category chips and sort order
//! - `editor` - Authoring form overlay
//! - `status` - Status bar widget

mod detail;
mod editor;
mod events;
mod filters;
mod helpers;
mod input;
mod loop_runner;
mod posts;
mod render;
mod status;

pub use loop_runner::{run, Action};
