//! crates/verse_feed_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any transport or storage format.

use serde::{Deserialize, Serialize};

/// One addressable unit of scripture content, immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub id: String,
    pub reference: String,
    pub text: String,
    pub copyright: String,
}

/// A verse placed in the feed buffer, carrying the background style token
/// derived from its buffer position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayVerse {
    pub verse: Verse,
    pub background_style: &'static str,
}

/// The language a given edition is written in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: String,
    pub name: String,
    pub name_local: String,
    pub script: String,
    pub direction: String,
}

/// A distinct translation/version of the source text corpus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edition {
    pub id: String,
    pub name: String,
    pub abbreviation: String,
    pub description: String,
    pub language: Language,
}

/// The persisted record of a verse the feed has shown. Copyright is
/// deliberately excluded from the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseSnapshot {
    pub id: String,
    pub reference: String,
    pub text: String,
}

impl VerseSnapshot {
    pub fn of(verse: &Verse) -> Self {
        Self {
            id: verse.id.clone(),
            reference: verse.reference.clone(),
            text: verse.text.clone(),
        }
    }
}
