//! quire: a terminal client for a JSON blog service.
//!
//! The library holds everything but process setup, so integration tests can
//! drive the cache, pipeline and selection logic directly.

pub mod api;
pub mod app;
pub mod config;
pub mod form;
pub mod keybindings;
pub mod pipeline;
pub mod selection;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod util;
