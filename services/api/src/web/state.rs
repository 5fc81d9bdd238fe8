//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use verse_feed_core::ports::VerseRepository;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn VerseRepository>,
    pub config: Arc<Config>,
}
