//! crates/verse_feed_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the scripture
//! content API or the key-value store backing persistence.

use async_trait::async_trait;

use crate::domain::{Edition, Verse};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the
/// upstream content API).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// Network failure or a 5xx from the upstream content provider.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
    /// The requested item does not exist upstream.
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A verse identifier failed structural validation. Indicates a caller
    /// bug rather than a transient condition.
    #[error("Invalid verse identifier: {0}")]
    InvalidVerseId(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Access to the upstream scripture content provider.
///
/// The feed state manager only uses `list_editions` and `fetch_verse_batch`;
/// the route layer additionally serves the legacy cursor mode through
/// `verses_after` and `verses_before`.
#[async_trait]
pub trait VerseRepository: Send + Sync {
    async fn list_editions(&self) -> PortResult<Vec<Edition>>;

    async fn get_edition(&self, edition_id: &str) -> PortResult<Edition>;

    /// Returns a fresh batch of candidate verses for the edition. The
    /// upstream has no "verses adjacent to X" capability in the common path,
    /// so callers treat every batch as a pool of candidates.
    async fn fetch_verse_batch(&self, edition_id: &str) -> PortResult<Vec<Verse>>;

    async fn verses_after(
        &self,
        edition_id: &str,
        verse_id: &str,
        count: usize,
    ) -> PortResult<Vec<Verse>>;

    async fn verses_before(
        &self,
        edition_id: &str,
        verse_id: &str,
        count: usize,
    ) -> PortResult<Vec<Verse>>;
}

/// A string-keyed value store that survives across sessions.
///
/// Access is synchronous by design: the feed state calls it on the same task
/// immediately after each in-memory mutation that must outlive the session.
/// Write failures are the adapter's concern and must not propagate.
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);
}
