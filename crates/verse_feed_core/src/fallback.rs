//! crates/verse_feed_core/src/fallback.rs
//!
//! Built-in fallback verses. The feed must never present a blank state, so
//! every failure path of the initial load degrades to one of these fixed
//! literals instead of an error.

use chrono::Utc;

use crate::domain::Verse;

/// Text substituted for candidates that arrive with empty content during
/// incremental loads.
pub const PLACEHOLDER_TEXT: &str = "The word of God is living and active.";

fn fallback_verse(tag: &str, reference: &str, text: &str) -> Verse {
    Verse {
        id: format!("fallback-{}-{}", tag, Utc::now().timestamp_millis()),
        reference: reference.to_string(),
        text: text.to_string(),
        copyright: String::new(),
    }
}

/// Shown when the repository request fails outright.
pub fn unavailable_fallback() -> Vec<Verse> {
    vec![fallback_verse(
        "error",
        "Isaiah 40:31",
        "But they who wait for the LORD shall renew their strength; they shall mount up with wings like eagles; they shall run and not be weary; they shall walk and not faint.",
    )]
}

/// Shown when the repository returns no verses at all.
pub fn empty_batch_fallback() -> Vec<Verse> {
    vec![fallback_verse(
        "empty",
        "Proverbs 3:5-6",
        "Trust in the LORD with all your heart, and do not lean on your own understanding. In all your ways acknowledge him, and he will make straight your paths.",
    )]
}

/// Shown when every candidate verse in the batch was filtered out for
/// empty text.
pub fn filtered_fallback() -> Vec<Verse> {
    vec![fallback_verse(
        "filtered",
        "Romans 8:28",
        "And we know that for those who love God all things work together for good, for those who are called according to his purpose.",
    )]
}
