//! crates/verse_feed_core/src/feed.rs
//!
//! The feed state manager. Owns the ordered buffer of loaded verses, the
//! read cursor, the per-verse liked set and the selected edition, and
//! mediates all access to the `VerseRepository` and `PersistentStore` ports.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::domain::{DisplayVerse, Edition, Verse, VerseSnapshot};
use crate::fallback;
use crate::ports::{PersistentStore, PortError, PortResult, VerseRepository};

//=========================================================================================
// Persisted Key Layout
//=========================================================================================

pub const SELECTED_EDITION_KEY: &str = "selected-edition-id";
pub const LIKED_VERSES_KEY: &str = "liked-verse-ids";
pub const SEEN_SNAPSHOTS_KEY: &str = "seen-verse-snapshots";

//=========================================================================================
// Tuning Constants
//=========================================================================================

/// Fixed palette of background style tokens, indexed by buffer position.
pub const BACKGROUND_STYLES: [&str; 14] = [
    "from-blue-900 to-indigo-800",
    "from-green-900 to-teal-800",
    "from-purple-900 to-pink-800",
    "from-red-900 to-orange-800",
    "from-emerald-900 to-cyan-800",
    "from-amber-900 to-yellow-700",
    "from-violet-900 to-fuchsia-800",
    "from-blue-900 via-purple-800 to-pink-900",
    "from-green-900 via-emerald-800 to-teal-900",
    "from-rose-900 via-red-800 to-orange-900",
    "from-indigo-900 via-violet-800 to-purple-900",
    "from-cyan-900 via-sky-800 to-blue-900",
    "from-fuchsia-900 via-pink-800 to-rose-900",
    "from-yellow-900 via-amber-800 to-orange-900",
];

/// How many verses an incremental load may add per request.
const LOAD_CHUNK: usize = 5;
/// Cursor distance from the buffer end that triggers a forward prefetch.
const FORWARD_THRESHOLD: usize = 3;
/// Cursor distance from the buffer start within which backward loads run.
const BACKWARD_THRESHOLD: usize = 2;

//=========================================================================================
// Retry Policy
//=========================================================================================

/// Bounded retry applied to verse batch fetches for one designated edition.
/// Every other edition gets a single attempt.
///
/// The edition named here is also the default selected by [`FeedState::initialize`]
/// when no persisted choice exists.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub edition_id: String,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    fn attempts_for(&self, edition_id: &str) -> u32 {
        if edition_id == self.edition_id {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

//=========================================================================================
// FeedState
//=========================================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Mutable feed state. Kept behind one mutex that is never held across an
/// await, so background prefetch tasks can share the holder via `Arc`.
struct FeedInner {
    editions: Vec<Edition>,
    current: Option<Edition>,
    buffer: Vec<DisplayVerse>,
    cursor: usize,
    likes: HashMap<String, bool>,
    snapshots: Vec<VerseSnapshot>,
    snapshot_ids: HashSet<String>,
    loading: bool,
    /// Bumped by every `reload`/`select_edition`. A fetch completion whose
    /// generation no longer matches is stale and gets discarded.
    generation: u64,
}

/// The verse feed state holder, constructed once at application start with
/// its collaborators injected.
pub struct FeedState {
    repository: Arc<dyn VerseRepository>,
    store: Arc<dyn PersistentStore>,
    retry: RetryPolicy,
    inner: Mutex<FeedInner>,
}

impl FeedState {
    /// Creates the holder and hydrates the liked set and the seen-verse
    /// snapshot side-table from the store.
    pub fn new(
        repository: Arc<dyn VerseRepository>,
        store: Arc<dyn PersistentStore>,
        retry: RetryPolicy,
    ) -> Self {
        let likes: HashMap<String, bool> = store
            .get(LIKED_VERSES_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        let snapshots: Vec<VerseSnapshot> = store
            .get(SEEN_SNAPSHOTS_KEY)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        let snapshot_ids = snapshots.iter().map(|s| s.id.clone()).collect();

        Self {
            repository,
            store,
            retry,
            inner: Mutex::new(FeedInner {
                editions: Vec::new(),
                current: None,
                buffer: Vec::new(),
                cursor: 0,
                likes,
                snapshots,
                snapshot_ids,
                loading: false,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedInner> {
        self.inner.lock().unwrap()
    }

    //=====================================================================================
    // Lifecycle Operations
    //=====================================================================================

    /// Selects the initial edition from the available list and loads the
    /// first batch of verses.
    ///
    /// Precedence: `preferred_edition_id` (falling back to the persisted
    /// selection) if it is still present among `editions`, then the
    /// designated default edition, then the first edition after sorting by
    /// name with the default forced to the front.
    pub async fn initialize(&self, mut editions: Vec<Edition>, preferred_edition_id: Option<String>) {
        let default_id = self.retry.edition_id.clone();
        editions.sort_by(|a, b| {
            if a.id == default_id {
                return std::cmp::Ordering::Less;
            }
            if b.id == default_id {
                return std::cmp::Ordering::Greater;
            }
            a.name.cmp(&b.name)
        });

        let preferred = preferred_edition_id.or_else(|| self.store.get(SELECTED_EDITION_KEY));
        let selected = preferred
            .and_then(|id| editions.iter().find(|e| e.id == id))
            .or_else(|| editions.iter().find(|e| e.id == default_id))
            .or_else(|| editions.first())
            .cloned();

        {
            let mut inner = self.lock();
            inner.editions = editions;
            inner.current = selected.clone();
        }

        if let Some(edition) = selected {
            self.store.set(SELECTED_EDITION_KEY, &edition.id);
            self.reload().await;
        }
    }

    /// Rebuilds the buffer from scratch for the current edition. Always
    /// finishes with at least one verse in the buffer and `loading == false`.
    pub async fn reload(&self) {
        let (edition, generation) = {
            let mut inner = self.lock();
            let Some(edition) = inner.current.clone() else {
                return;
            };
            inner.generation += 1;
            inner.buffer.clear();
            inner.cursor = 0;
            inner.loading = true;
            (edition, inner.generation)
        };

        let verses = match self.fetch_batch_with_retry(&edition.id).await {
            Ok(batch) if batch.is_empty() => {
                warn!(edition = %edition.id, "initial verse batch was empty, using fallback");
                fallback::empty_batch_fallback()
            }
            Ok(batch) => {
                let mut pool = batch;
                pool.shuffle(&mut rand::thread_rng());
                // Initial load drops unusable verses; styles are assigned
                // afterwards so positions stay contiguous.
                let usable: Vec<Verse> = pool
                    .into_iter()
                    .filter(|v| !v.text.trim().is_empty())
                    .collect();
                if usable.is_empty() {
                    warn!(edition = %edition.id, "every verse in the batch had empty text, using fallback");
                    fallback::filtered_fallback()
                } else {
                    usable
                }
            }
            Err(err) => {
                warn!(edition = %edition.id, error = %err, "failed to fetch initial verses, using fallback");
                fallback::unavailable_fallback()
            }
        };

        let mut inner = self.lock();
        if inner.generation != generation {
            // Superseded by a newer reload or edition switch.
            return;
        }
        inner.buffer = verses
            .into_iter()
            .enumerate()
            .map(|(idx, verse)| DisplayVerse {
                background_style: BACKGROUND_STYLES[idx % BACKGROUND_STYLES.len()],
                verse,
            })
            .collect();
        inner.cursor = 0;
        inner.loading = false;
        info!(edition = %edition.id, verses = inner.buffer.len(), "feed reloaded");
        self.record_snapshots(&mut inner);
    }

    /// Switches to another known edition and rebuilds the feed for it.
    /// Unknown edition ids are ignored.
    pub async fn select_edition(&self, edition_id: &str) {
        let found = {
            let mut inner = self.lock();
            let edition = inner.editions.iter().find(|e| e.id == edition_id).cloned();
            if let Some(edition) = &edition {
                inner.current = Some(edition.clone());
            }
            edition
        };
        if let Some(edition) = found {
            self.store.set(SELECTED_EDITION_KEY, &edition.id);
            self.reload().await;
        }
    }

    //=====================================================================================
    // Navigation
    //=====================================================================================

    /// Moves the cursor forward by one, clamped to the end of the buffer,
    /// and prefetches more verses in the background when the end is near.
    ///
    /// Must be called from within a Tokio runtime; the prefetch is spawned
    /// and never blocks the cursor move.
    pub fn advance(self: &Arc<Self>) {
        let prefetch = {
            let mut inner = self.lock();
            if inner.buffer.is_empty() {
                return;
            }
            if inner.cursor + 1 < inner.buffer.len() {
                inner.cursor += 1;
            }
            inner.cursor + FORWARD_THRESHOLD >= inner.buffer.len()
        };
        if prefetch {
            let state = Arc::clone(self);
            tokio::spawn(async move { state.load_forward().await });
        }
    }

    /// Moves the cursor back by one, clamped to the start of the buffer, and
    /// prefetches earlier verses when the start region is reached.
    pub fn retreat(self: &Arc<Self>) {
        let prefetch = {
            let mut inner = self.lock();
            if inner.buffer.is_empty() {
                return;
            }
            inner.cursor = inner.cursor.saturating_sub(1);
            inner.cursor > 0 && inner.cursor <= BACKWARD_THRESHOLD
        };
        if prefetch {
            let state = Arc::clone(self);
            tokio::spawn(async move { state.load_backward().await });
        }
    }

    //=====================================================================================
    // Incremental Loads
    //=====================================================================================

    /// Grows the buffer at the end. Repository failures are logged and leave
    /// the buffer unchanged.
    pub async fn load_forward(&self) {
        self.load_incremental(Direction::Forward).await;
    }

    /// Grows the buffer at the front, shifting the cursor so the currently
    /// viewed verse stays in place. No-op once the cursor has scrolled past
    /// the start region.
    pub async fn load_backward(&self) {
        self.load_incremental(Direction::Backward).await;
    }

    async fn load_incremental(&self, direction: Direction) {
        let (edition, generation) = {
            let mut inner = self.lock();
            let Some(edition) = inner.current.clone() else {
                return;
            };
            if inner.buffer.is_empty() {
                return;
            }
            if direction == Direction::Backward && inner.cursor > BACKWARD_THRESHOLD {
                return;
            }
            inner.loading = true;
            (edition, inner.generation)
        };

        match self.fetch_batch_with_retry(&edition.id).await {
            Ok(batch) => self.apply_batch(batch, generation, direction),
            Err(err) => {
                warn!(edition = %edition.id, error = %err, "incremental verse load failed");
                let mut inner = self.lock();
                if inner.generation == generation {
                    inner.loading = false;
                }
            }
        }
    }

    fn apply_batch(&self, batch: Vec<Verse>, generation: u64, direction: Direction) {
        let mut inner = self.lock();
        if inner.generation != generation {
            // A reload or edition switch owns the buffer now.
            return;
        }
        inner.loading = false;
        if batch.is_empty() {
            return;
        }

        let mut pool = batch;
        pool.shuffle(&mut rand::thread_rng());

        let existing: HashSet<String> = inner.buffer.iter().map(|d| d.verse.id.clone()).collect();
        let mut fresh: Vec<Verse> = pool
            .iter()
            .filter(|v| !existing.contains(&v.id))
            .take(LOAD_CHUNK)
            .cloned()
            .collect();
        if fresh.is_empty() {
            // The whole pool overlaps the buffer. Accept duplicates rather
            // than leave the feed stuck.
            fresh = pool.into_iter().take(LOAD_CHUNK).collect();
        }

        // Incremental loads substitute a placeholder instead of dropping, so
        // position-indexed style assignment stays stable.
        for verse in &mut fresh {
            if verse.text.trim().is_empty() {
                verse.text = fallback::PLACEHOLDER_TEXT.to_string();
            }
        }

        match direction {
            Direction::Forward => {
                let base = inner.buffer.len();
                let appended: Vec<DisplayVerse> = fresh
                    .into_iter()
                    .enumerate()
                    .map(|(idx, verse)| DisplayVerse {
                        background_style: BACKGROUND_STYLES[(base + idx) % BACKGROUND_STYLES.len()],
                        verse,
                    })
                    .collect();
                inner.buffer.extend(appended);
            }
            Direction::Backward => {
                let added = fresh.len();
                let mut block: Vec<DisplayVerse> = fresh
                    .into_iter()
                    .enumerate()
                    .map(|(idx, verse)| DisplayVerse {
                        background_style: BACKGROUND_STYLES[idx % BACKGROUND_STYLES.len()],
                        verse,
                    })
                    .collect();
                block.append(&mut inner.buffer);
                inner.buffer = block;
                inner.cursor += added;
            }
        }
        self.record_snapshots(&mut inner);
    }

    /// Fetches one candidate batch, retrying only for the designated edition.
    async fn fetch_batch_with_retry(&self, edition_id: &str) -> PortResult<Vec<Verse>> {
        let attempts = self.retry.attempts_for(edition_id);
        let mut last_err = PortError::Unavailable("no attempt was made".to_string());
        for attempt in 1..=attempts {
            match self.repository.fetch_verse_batch(edition_id).await {
                Ok(batch) => return Ok(batch),
                Err(err) => {
                    warn!(
                        edition = %edition_id,
                        attempt,
                        max_attempts = attempts,
                        error = %err,
                        "verse batch request failed"
                    );
                    last_err = err;
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
        Err(last_err)
    }

    //=====================================================================================
    // Likes and Snapshots
    //=====================================================================================

    /// Flips the liked flag for a verse and persists the liked set
    /// immediately. Never fails.
    pub fn toggle_like(&self, verse_id: &str) {
        let mut inner = self.lock();
        if inner.likes.remove(verse_id).is_none() {
            inner.likes.insert(verse_id.to_string(), true);
        }
        if let Ok(raw) = serde_json::to_string(&inner.likes) {
            self.store.set(LIKED_VERSES_KEY, &raw);
        }
    }

    /// Records buffer verses not yet in the snapshot side-table and persists
    /// the table, so liked verses stay viewable after leaving the buffer.
    fn record_snapshots(&self, inner: &mut FeedInner) {
        let unseen: Vec<VerseSnapshot> = inner
            .buffer
            .iter()
            .filter(|d| !inner.snapshot_ids.contains(&d.verse.id))
            .map(|d| VerseSnapshot::of(&d.verse))
            .collect();
        if unseen.is_empty() {
            return;
        }
        for snapshot in unseen {
            inner.snapshot_ids.insert(snapshot.id.clone());
            inner.snapshots.push(snapshot);
        }
        if let Ok(raw) = serde_json::to_string(&inner.snapshots) {
            self.store.set(SEEN_SNAPSHOTS_KEY, &raw);
        }
    }

    //=====================================================================================
    // Read Accessors
    //=====================================================================================

    pub fn current_verse(&self) -> Option<DisplayVerse> {
        let inner = self.lock();
        inner.buffer.get(inner.cursor).cloned()
    }

    pub fn can_go_back(&self) -> bool {
        self.lock().cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        let inner = self.lock();
        inner.cursor + 1 < inner.buffer.len()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn cursor(&self) -> usize {
        self.lock().cursor
    }

    pub fn buffer_len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn buffer(&self) -> Vec<DisplayVerse> {
        self.lock().buffer.clone()
    }

    pub fn editions(&self) -> Vec<Edition> {
        self.lock().editions.clone()
    }

    pub fn current_edition(&self) -> Option<Edition> {
        self.lock().current.clone()
    }

    pub fn is_liked(&self, verse_id: &str) -> bool {
        self.lock().likes.get(verse_id).copied().unwrap_or(false)
    }

    pub fn likes(&self) -> HashMap<String, bool> {
        self.lock().likes.clone()
    }

    /// All liked verses that the feed has ever shown, rendered from the
    /// snapshot side-table rather than the live buffer.
    pub fn liked_verses(&self) -> Vec<VerseSnapshot> {
        let inner = self.lock();
        inner
            .snapshots
            .iter()
            .filter(|s| inner.likes.get(&s.id).copied().unwrap_or(false))
            .cloned()
            .collect()
    }
}

//=========================================================================================
// Tests
//=========================================================================================
