//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.
//!
//! The verse endpoints never surface an upstream failure to the caller:
//! they respond 200 with fixed fallback verses so the feed always has
//! something to show.

use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use verse_feed_core::domain::{Edition, Verse};
use verse_feed_core::ports::PortError;

/// Verses returned per legacy-cursor page when the caller does not ask for
/// a specific count.
const DEFAULT_PAGE_COUNT: usize = 5;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_editions_handler,
        get_edition_handler,
        get_verses_handler,
        get_verses_after_handler,
        get_verses_before_handler,
    ),
    tags(
        (name = "VerseFeed API", description = "Verse feed endpoints proxying the scripture content API.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize)]
pub struct EditionsResponse {
    editions: Vec<Edition>,
}

#[derive(Serialize)]
pub struct EditionResponse {
    edition: Edition,
}

#[derive(Serialize)]
pub struct VersesResponse {
    verses: Vec<Verse>,
}

#[derive(Deserialize)]
pub struct PageQuery {
    count: Option<usize>,
}

fn port_error_status(err: &PortError) -> StatusCode {
    match err {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::InvalidVerseId(_) => StatusCode::BAD_REQUEST,
        PortError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List all available editions.
///
/// Degrades to an empty list when the upstream API is unreachable.
#[utoipa::path(
    get,
    path = "/editions",
    responses(
        (status = 200, description = "The available editions; empty on upstream failure")
    )
)]
pub async fn list_editions_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<EditionsResponse> {
    match app_state.repository.list_editions().await {
        Ok(editions) => {
            info!("Retrieved {} editions", editions.len());
            Json(EditionsResponse { editions })
        }
        Err(err) => {
            error!("Failed to list editions: {err}");
            Json(EditionsResponse {
                editions: Vec::new(),
            })
        }
    }
}

/// Fetch a single edition by id.
#[utoipa::path(
    get,
    path = "/editions/{edition_id}",
    responses(
        (status = 200, description = "The requested edition"),
        (status = 404, description = "Unknown edition id"),
        (status = 503, description = "Upstream API unavailable")
    ),
    params(
        ("edition_id" = String, Path, description = "The edition to fetch.")
    )
)]
pub async fn get_edition_handler(
    State(app_state): State<Arc<AppState>>,
    Path(edition_id): Path<String>,
) -> Result<Json<EditionResponse>, (StatusCode, String)> {
    match app_state.repository.get_edition(&edition_id).await {
        Ok(edition) => {
            info!("Retrieved edition: {}", edition.name);
            Ok(Json(EditionResponse { edition }))
        }
        Err(err) => {
            error!("Failed to get edition {edition_id}: {err}");
            Err((port_error_status(&err), err.to_string()))
        }
    }
}

/// Fetch an initial/refresh batch of verses for an edition.
#[utoipa::path(
    get,
    path = "/verses/{edition_id}",
    responses(
        (status = 200, description = "A batch of verses; fallback verses on upstream failure")
    ),
    params(
        ("edition_id" = String, Path, description = "The edition to fetch verses for.")
    )
)]
pub async fn get_verses_handler(
    State(app_state): State<Arc<AppState>>,
    Path(edition_id): Path<String>,
) -> Json<VersesResponse> {
    match app_state.repository.fetch_verse_batch(&edition_id).await {
        Ok(verses) if verses.is_empty() => {
            warn!("No featured verses available for edition {edition_id}, using fallback");
            Json(VersesResponse {
                verses: empty_batch_fallback(),
            })
        }
        Ok(verses) => {
            info!("Retrieved {} featured verses for edition {edition_id}", verses.len());
            Json(VersesResponse { verses })
        }
        Err(err) => {
            error!("Failed to get verses for edition {edition_id}: {err}");
            Json(VersesResponse {
                verses: featured_error_fallback(),
            })
        }
    }
}

/// Fetch verses following a given verse (legacy cursor mode).
#[utoipa::path(
    get,
    path = "/verses/{edition_id}/after/{verse_id}",
    responses(
        (status = 200, description = "Verses after the given verse; a fallback verse on upstream failure"),
        (status = 400, description = "Malformed verse identifier")
    ),
    params(
        ("edition_id" = String, Path, description = "The edition to fetch verses for."),
        ("verse_id" = String, Path, description = "The verse to paginate after."),
        ("count" = Option<usize>, Query, description = "How many verses to return (default 5).")
    )
)]
pub async fn get_verses_after_handler(
    State(app_state): State<Arc<AppState>>,
    Path((edition_id, verse_id)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<VersesResponse>, (StatusCode, String)> {
    let count = query.count.unwrap_or(DEFAULT_PAGE_COUNT);
    match app_state
        .repository
        .verses_after(&edition_id, &verse_id, count)
        .await
    {
        Ok(verses) => {
            info!("Retrieved {} verses after {verse_id}", verses.len());
            Ok(Json(VersesResponse { verses }))
        }
        Err(err @ PortError::InvalidVerseId(_)) => {
            Err((StatusCode::BAD_REQUEST, err.to_string()))
        }
        Err(err) => {
            error!("Failed to get verses after {verse_id} for edition {edition_id}: {err}");
            Ok(Json(VersesResponse {
                verses: after_error_fallback(),
            }))
        }
    }
}

/// Fetch verses preceding a given verse (legacy cursor mode).
#[utoipa::path(
    get,
    path = "/verses/{edition_id}/before/{verse_id}",
    responses(
        (status = 200, description = "Verses before the given verse; a fallback verse on upstream failure"),
        (status = 400, description = "Malformed verse identifier")
    ),
    params(
        ("edition_id" = String, Path, description = "The edition to fetch verses for."),
        ("verse_id" = String, Path, description = "The verse to paginate before."),
        ("count" = Option<usize>, Query, description = "How many verses to return (default 5).")
    )
)]
pub async fn get_verses_before_handler(
    State(app_state): State<Arc<AppState>>,
    Path((edition_id, verse_id)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<VersesResponse>, (StatusCode, String)> {
    let count = query.count.unwrap_or(DEFAULT_PAGE_COUNT);
    match app_state
        .repository
        .verses_before(&edition_id, &verse_id, count)
        .await
    {
        Ok(verses) => {
            info!("Retrieved {} verses before {verse_id}", verses.len());
            Ok(Json(VersesResponse { verses }))
        }
        Err(err @ PortError::InvalidVerseId(_)) => {
            Err((StatusCode::BAD_REQUEST, err.to_string()))
        }
        Err(err) => {
            error!("Failed to get verses before {verse_id} for edition {edition_id}: {err}");
            Ok(Json(VersesResponse {
                verses: before_error_fallback(),
            }))
        }
    }
}

//=========================================================================================
// Route-level Fallback Verses
//=========================================================================================

fn fallback_verse(tag: &str, reference: &str, text: &str) -> Verse {
    Verse {
        id: format!("fallback-{}-{}", tag, Utc::now().timestamp_millis()),
        reference: reference.to_string(),
        text: text.to_string(),
        copyright: "Fallback verse".to_string(),
    }
}

fn empty_batch_fallback() -> Vec<Verse> {
    vec![fallback_verse(
        "empty",
        "Psalm 119:105",
        "Your word is a lamp to my feet and a light to my path.",
    )]
}

fn featured_error_fallback() -> Vec<Verse> {
    vec![
        fallback_verse(
            "error-1",
            "Romans 8:28",
            "And we know that for those who love God all things work together for good, for those who are called according to his purpose.",
        ),
        fallback_verse(
            "error-2",
            "Isaiah 41:10",
            "Fear not, for I am with you; be not dismayed, for I am your God; I will strengthen you, I will help you, I will uphold you with my righteous right hand.",
        ),
    ]
}

fn after_error_fallback() -> Vec<Verse> {
    vec![fallback_verse(
        "after-error",
        "Philippians 4:13",
        "I can do all things through him who strengthens me.",
    )]
}

fn before_error_fallback() -> Vec<Verse> {
    vec![fallback_verse(
        "before-error",
        "Psalm 46:1",
        "God is our refuge and strength, a very present help in trouble.",
    )]
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use std::net::SocketAddr;
    use std::time::Duration;
    use verse_feed_core::domain::Language;
    use verse_feed_core::ports::{PortResult, VerseRepository};

    /// A repository stub whose every operation returns a clone of the
    /// configured results.
    struct StubRepository {
        editions: PortResult<Vec<Edition>>,
        batch: PortResult<Vec<Verse>>,
        page: PortResult<Vec<Verse>>,
    }

    impl StubRepository {
        fn failing() -> Self {
            Self {
                editions: Err(PortError::Unavailable("down".to_string())),
                batch: Err(PortError::Unavailable("down".to_string())),
                page: Err(PortError::Unavailable("down".to_string())),
            }
        }
    }

    fn clone_result(result: &PortResult<Vec<Verse>>) -> PortResult<Vec<Verse>> {
        match result {
            Ok(verses) => Ok(verses.clone()),
            Err(err) => Err(PortError::Unavailable(err.to_string())),
        }
    }

    #[async_trait]
    impl VerseRepository for StubRepository {
        async fn list_editions(&self) -> PortResult<Vec<Edition>> {
            match &self.editions {
                Ok(editions) => Ok(editions.clone()),
                Err(err) => Err(PortError::Unavailable(err.to_string())),
            }
        }

        async fn get_edition(&self, edition_id: &str) -> PortResult<Edition> {
            Err(PortError::NotFound(edition_id.to_string()))
        }

        async fn fetch_verse_batch(&self, _edition_id: &str) -> PortResult<Vec<Verse>> {
            clone_result(&self.batch)
        }

        async fn verses_after(
            &self,
            _edition_id: &str,
            verse_id: &str,
            _count: usize,
        ) -> PortResult<Vec<Verse>> {
            if !verse_id.contains('.') {
                return Err(PortError::InvalidVerseId(verse_id.to_string()));
            }
            clone_result(&self.page)
        }

        async fn verses_before(
            &self,
            _edition_id: &str,
            verse_id: &str,
            _count: usize,
        ) -> PortResult<Vec<Verse>> {
            if !verse_id.contains('.') {
                return Err(PortError::InvalidVerseId(verse_id.to_string()));
            }
            clone_result(&self.page)
        }
    }

    fn test_state(repository: StubRepository) -> Arc<AppState> {
        Arc::new(AppState {
            repository: Arc::new(repository),
            config: Arc::new(Config {
                bind_address: "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
                log_level: tracing::Level::INFO,
                bible_api_base_url: "http://unused".to_string(),
                bible_api_key: "test-key".to_string(),
                default_edition_id: "default-ed".to_string(),
                retry_max_attempts: 3,
                retry_delay: Duration::from_millis(1),
                allowed_origin: "http://localhost:3000".to_string(),
            }),
        })
    }

    fn verse(id: &str) -> Verse {
        Verse {
            id: id.to_string(),
            reference: format!("Ref {id}"),
            text: format!("Text of {id}"),
            copyright: String::new(),
        }
    }

    fn edition(id: &str) -> Edition {
        Edition {
            id: id.to_string(),
            name: format!("Edition {id}"),
            abbreviation: id.to_uppercase(),
            description: String::new(),
            language: Language::default(),
        }
    }

    #[tokio::test]
    async fn editions_list_degrades_to_empty_on_failure() {
        let state = test_state(StubRepository::failing());
        let response = list_editions_handler(State(state)).await;
        assert!(response.0.editions.is_empty());

        let state = test_state(StubRepository {
            editions: Ok(vec![edition("a"), edition("b")]),
            ..StubRepository::failing()
        });
        let response = list_editions_handler(State(state)).await;
        assert_eq!(response.0.editions.len(), 2);
    }

    #[tokio::test]
    async fn unknown_edition_propagates_not_found() {
        let state = test_state(StubRepository::failing());
        let result = get_edition_handler(State(state), Path("missing".to_string())).await;
        let (status, _) = result.err().unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn verse_batch_failure_injects_fallback_with_ok_status() {
        let state = test_state(StubRepository::failing());
        let response = get_verses_handler(State(state), Path("ed-1".to_string())).await;
        let verses = response.0.verses;
        assert_eq!(verses.len(), 2);
        assert!(verses.iter().all(|v| v.id.starts_with("fallback-")));
        assert_eq!(verses[0].reference, "Romans 8:28");
    }

    #[tokio::test]
    async fn empty_verse_batch_injects_the_empty_fallback() {
        let state = test_state(StubRepository {
            batch: Ok(Vec::new()),
            ..StubRepository::failing()
        });
        let response = get_verses_handler(State(state), Path("ed-1".to_string())).await;
        assert_eq!(response.0.verses.len(), 1);
        assert_eq!(response.0.verses[0].reference, "Psalm 119:105");
    }

    #[tokio::test]
    async fn malformed_verse_id_is_a_client_error() {
        let state = test_state(StubRepository::failing());
        let result = get_verses_after_handler(
            State(state.clone()),
            Path(("ed-1".to_string(), "notaverse".to_string())),
            Query(PageQuery { count: None }),
        )
        .await;
        let (status, _) = result.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let result = get_verses_before_handler(
            State(state),
            Path(("ed-1".to_string(), "notaverse".to_string())),
            Query(PageQuery { count: None }),
        )
        .await;
        let (status, _) = result.err().unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cursor_pages_fall_back_on_upstream_failure() {
        let state = test_state(StubRepository::failing());
        let response = get_verses_after_handler(
            State(state.clone()),
            Path(("ed-1".to_string(), "JHN.3.16".to_string())),
            Query(PageQuery { count: Some(3) }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.verses[0].reference, "Philippians 4:13");

        let response = get_verses_before_handler(
            State(state),
            Path(("ed-1".to_string(), "JHN.3.16".to_string())),
            Query(PageQuery { count: Some(3) }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.verses[0].reference, "Psalm 46:1");
    }

    #[tokio::test]
    async fn successful_cursor_page_passes_through() {
        let state = test_state(StubRepository {
            page: Ok(vec![verse("JHN.3.17"), verse("JHN.3.18")]),
            ..StubRepository::failing()
        });
        let response = get_verses_after_handler(
            State(state),
            Path(("ed-1".to_string(), "JHN.3.16".to_string())),
            Query(PageQuery { count: None }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.verses.len(), 2);
        assert_eq!(response.0.verses[0].id, "JHN.3.17");
    }
}
