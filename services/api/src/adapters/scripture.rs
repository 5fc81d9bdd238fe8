//! services/api/src/adapters/scripture.rs
//!
//! This module contains the adapter for the external scripture content API
//! (api.scripture.api.bible). It implements the `VerseRepository` port from
//! the `core` crate.

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{info, warn};
use uuid::Uuid;
use verse_feed_core::domain::{Edition, Language, Verse};
use verse_feed_core::ports::{PortError, PortResult, VerseRepository};

/// Passages fetched to build an initial/refresh candidate batch. The
/// upstream has no random-verse endpoint, so a fixed set of well-known
/// passages serves as the candidate pool.
const FEATURED_PASSAGES: [&str; 10] = [
    "JHN.3.16",            // John 3:16
    "PSA.23",              // Psalm 23
    "PRO.3.5-PRO.3.6",     // Proverbs 3:5-6
    "MAT.6.26",            // Matthew 6:26
    "ROM.8.28",            // Romans 8:28
    "PHP.4.13",            // Philippians 4:13
    "JER.29.11",           // Jeremiah 29:11
    "PSA.19.1",            // Psalm 19:1
    "ISA.40.31",           // Isaiah 40:31
    "MAT.28.19-MAT.28.20", // Matthew 28:19-20
];

/// Shape of a legacy-cursor verse id: `BOOK.CHAPTER.VERSE`.
fn verse_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9]+\.[A-Za-z0-9]+\.\d+$").unwrap())
}

fn parse_verse_id(verse_id: &str) -> PortResult<(String, String, u32)> {
    if !verse_id_pattern().is_match(verse_id) {
        return Err(PortError::InvalidVerseId(verse_id.to_string()));
    }
    let mut parts = verse_id.split('.');
    let book = parts.next().unwrap_or_default().to_string();
    let chapter = parts.next().unwrap_or_default().to_string();
    let number = parts
        .next()
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(|| PortError::InvalidVerseId(verse_id.to_string()))?;
    Ok((book, chapter, number))
}

/// Extracts the trailing verse number from an upstream verse id.
fn verse_number(verse_id: &str) -> Option<u32> {
    verse_id.split('.').nth(2).and_then(|n| n.parse().ok())
}

//=========================================================================================
// "Impure" Upstream Response Structs
//=========================================================================================

// Every field defaults so a response with an unexpected shape degrades to
// partial data instead of failing the whole request.

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    data: T,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ApiLanguage {
    id: String,
    name: String,
    name_local: String,
    script: String,
    script_direction: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ApiBible {
    id: String,
    name: String,
    abbreviation: String,
    description: Option<String>,
    language: ApiLanguage,
}

impl ApiBible {
    fn to_domain(self) -> Edition {
        Edition {
            id: self.id,
            name: self.name,
            abbreviation: self.abbreviation,
            description: self.description.unwrap_or_default(),
            language: Language {
                id: self.language.id,
                name: self.language.name,
                name_local: self.language.name_local,
                script: self.language.script,
                direction: if self.language.script_direction.is_empty() {
                    "ltr".to_string()
                } else {
                    self.language.script_direction
                },
            },
        }
    }
}

/// Shared shape of the passage and single-verse content endpoints.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ApiContent {
    id: String,
    reference: String,
    content: String,
    copyright: String,
}

impl ApiContent {
    fn to_domain(self) -> Verse {
        Verse {
            id: if self.id.is_empty() {
                format!("verse-{}", Uuid::new_v4())
            } else {
                self.id
            },
            reference: if self.reference.is_empty() {
                "Bible Verse".to_string()
            } else {
                self.reference
            },
            text: self.content,
            copyright: self.copyright,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ApiChapterLink {
    id: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ApiChapter {
    next: Option<ApiChapterLink>,
    previous: Option<ApiChapterLink>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ApiChapterVerse {
    id: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `VerseRepository` against the scripture
/// content API.
#[derive(Clone)]
pub struct ScriptureApiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ScriptureApiAdapter {
    /// Creates a new `ScriptureApiAdapter`.
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Performs one GET against the upstream API and unwraps the `data`
    /// envelope.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> PortResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| PortError::Unavailable(format!("no response from scripture API: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(PortError::Unavailable(format!(
                "scripture API returned {status} for {path}"
            )));
        }
        response
            .json::<ApiEnvelope<T>>()
            .await
            .map(|envelope| envelope.data)
            .map_err(|e| PortError::Unavailable(format!("unreadable scripture API response: {e}")))
    }

    async fn fetch_passage(&self, edition_id: &str, passage: &str) -> PortResult<Verse> {
        let content: ApiContent = self
            .get_json(
                &format!("/bibles/{edition_id}/passages/{passage}"),
                &[
                    ("content-type", "text"),
                    ("include-titles", "false"),
                    ("include-chapter-numbers", "false"),
                    ("include-verse-numbers", "false"),
                ],
            )
            .await?;
        Ok(content.to_domain())
    }

    async fn fetch_verse_content(&self, edition_id: &str, verse_id: &str) -> PortResult<Verse> {
        let content: ApiContent = self
            .get_json(
                &format!("/bibles/{edition_id}/verses/{verse_id}"),
                &[("content-type", "text"), ("include-verse-numbers", "false")],
            )
            .await?;
        Ok(content.to_domain())
    }

    async fn fetch_chapter(&self, edition_id: &str, chapter_id: &str) -> PortResult<ApiChapter> {
        self.get_json(&format!("/bibles/{edition_id}/chapters/{chapter_id}"), &[])
            .await
    }

    async fn fetch_chapter_verses(
        &self,
        edition_id: &str,
        chapter_id: &str,
    ) -> PortResult<Vec<ApiChapterVerse>> {
        self.get_json(
            &format!("/bibles/{edition_id}/chapters/{chapter_id}/verses"),
            &[],
        )
        .await
    }
}

//=========================================================================================
// `VerseRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl VerseRepository for ScriptureApiAdapter {
    async fn list_editions(&self) -> PortResult<Vec<Edition>> {
        let bibles: Vec<ApiBible> = self.get_json("/bibles", &[]).await?;
        Ok(bibles.into_iter().map(ApiBible::to_domain).collect())
    }

    async fn get_edition(&self, edition_id: &str) -> PortResult<Edition> {
        let bible: ApiBible = self.get_json(&format!("/bibles/{edition_id}"), &[]).await?;
        Ok(bible.to_domain())
    }

    async fn fetch_verse_batch(&self, edition_id: &str) -> PortResult<Vec<Verse>> {
        let fetches = FEATURED_PASSAGES
            .iter()
            .map(|passage| self.fetch_passage(edition_id, passage));
        let results = join_all(fetches).await;

        let mut verses = Vec::new();
        for (passage, result) in FEATURED_PASSAGES.iter().zip(results) {
            match result {
                Ok(verse) => verses.push(verse),
                Err(err) => {
                    warn!(passage, edition = %edition_id, error = %err, "failed to fetch featured passage");
                }
            }
        }
        info!(edition = %edition_id, verses = verses.len(), "fetched featured verse batch");
        Ok(verses)
    }

    async fn verses_after(
        &self,
        edition_id: &str,
        verse_id: &str,
        count: usize,
    ) -> PortResult<Vec<Verse>> {
        let (book, chapter, start_number) = parse_verse_id(verse_id)?;

        let mut chapter_id = format!("{book}.{chapter}");
        let mut current = Some(self.fetch_chapter(edition_id, &chapter_id).await?);
        // Only verses numbered above this are collected; resets when the
        // walk crosses into the next chapter.
        let mut floor = start_number;
        let mut results: Vec<Verse> = Vec::new();

        while results.len() < count {
            let Some(chapter_data) = current.take() else {
                break;
            };
            let listing = self.fetch_chapter_verses(edition_id, &chapter_id).await?;
            let candidates: Vec<ApiChapterVerse> = listing
                .into_iter()
                .filter(|v| verse_number(&v.id).is_some_and(|n| n > floor))
                .take(count - results.len())
                .collect();

            for candidate in candidates {
                match self.fetch_verse_content(edition_id, &candidate.id).await {
                    Ok(verse) => {
                        results.push(verse);
                        if results.len() >= count {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(verse = %candidate.id, error = %err, "failed to fetch verse content");
                    }
                }
            }

            if results.len() >= count {
                break;
            }
            let Some(next) = chapter_data.next else {
                break;
            };
            floor = 0;
            chapter_id = next.id;
            match self.fetch_chapter(edition_id, &chapter_id).await {
                Ok(data) => current = Some(data),
                Err(err) => {
                    warn!(chapter = %chapter_id, error = %err, "failed to fetch next chapter");
                    current = None;
                }
            }
        }

        Ok(results)
    }

    async fn verses_before(
        &self,
        edition_id: &str,
        verse_id: &str,
        count: usize,
    ) -> PortResult<Vec<Verse>> {
        let (book, chapter, start_number) = parse_verse_id(verse_id)?;

        let mut chapter_id = format!("{book}.{chapter}");
        let mut current = Some(self.fetch_chapter(edition_id, &chapter_id).await?);
        // Only verses numbered below this are collected; lifted once the
        // walk crosses into a previous chapter, whose verses all qualify.
        let mut ceiling = start_number;
        let mut results: Vec<Verse> = Vec::new();

        while results.len() < count {
            let Some(chapter_data) = current.take() else {
                break;
            };
            let listing = self.fetch_chapter_verses(edition_id, &chapter_id).await?;
            let mut candidates: Vec<ApiChapterVerse> = listing
                .into_iter()
                .filter(|v| verse_number(&v.id).is_some_and(|n| n < ceiling))
                .collect();
            candidates.reverse();
            candidates.truncate(count - results.len());

            for candidate in candidates {
                match self.fetch_verse_content(edition_id, &candidate.id).await {
                    Ok(verse) => {
                        results.insert(0, verse);
                        if results.len() >= count {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(verse = %candidate.id, error = %err, "failed to fetch verse content");
                    }
                }
            }

            if results.len() >= count {
                break;
            }
            let Some(previous) = chapter_data.previous else {
                break;
            };
            ceiling = u32::MAX;
            chapter_id = previous.id;
            match self.fetch_chapter(edition_id, &chapter_id).await {
                Ok(data) => current = Some(data),
                Err(err) => {
                    warn!(chapter = %chapter_id, error = %err, "failed to fetch previous chapter");
                    current = None;
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_verse_ids() {
        assert_eq!(
            parse_verse_id("JHN.3.16").unwrap(),
            ("JHN".to_string(), "3".to_string(), 16)
        );
        assert_eq!(
            parse_verse_id("1JN.4.19").unwrap(),
            ("1JN".to_string(), "4".to_string(), 19)
        );
    }

    #[test]
    fn rejects_malformed_verse_ids() {
        for id in ["JHN.3", "JHN", "", "JHN.3.sixteen", "JHN.3.16-JHN.3.17"] {
            assert!(
                matches!(parse_verse_id(id), Err(PortError::InvalidVerseId(_))),
                "expected {id:?} to be rejected"
            );
        }
    }

    #[test]
    fn verse_number_reads_the_trailing_segment() {
        assert_eq!(verse_number("PSA.23.1"), Some(1));
        assert_eq!(verse_number("PSA.23"), None);
    }

    #[test]
    fn bible_mapping_defaults_missing_fields() {
        let bible: ApiBible =
            serde_json::from_str(r#"{"id": "abc-01", "name": "Test Version"}"#).unwrap();
        let edition = bible.to_domain();
        assert_eq!(edition.id, "abc-01");
        assert_eq!(edition.name, "Test Version");
        assert_eq!(edition.abbreviation, "");
        assert_eq!(edition.language.direction, "ltr");
    }

    #[test]
    fn content_mapping_generates_an_id_when_missing() {
        let content: ApiContent = serde_json::from_str(r#"{"content": "Some text"}"#).unwrap();
        let verse = content.to_domain();
        assert!(verse.id.starts_with("verse-"));
        assert_eq!(verse.reference, "Bible Verse");
        assert_eq!(verse.text, "Some text");
    }
}
