//! API request handlers

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kashi_common::time;
use kashi_common::types::{
    CaptionTrack, LyricsDocument, SongIdentity, TranslationAction, VersionedLyrics,
};
use kashi_common::Error;

use crate::db::local_lyrics;
use crate::resolver::ResolveRequest;

use super::server::AppContext;

/// Error wrapper mapping the taxonomy onto HTTP statuses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Provider(_) | Error::InvalidResponse(_) | Error::Translation(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::InvalidInput(_) | Error::Config(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Query parameters for the simple GET form
#[derive(Debug, Deserialize)]
pub struct LyricsQuery {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    pub duration: u64,
    #[serde(default)]
    pub force_reload: bool,
}

pub async fn get_lyrics(
    State(ctx): State<AppContext>,
    Query(query): Query<LyricsQuery>,
) -> ApiResult<Json<VersionedLyrics>> {
    let request = ResolveRequest {
        song: SongIdentity {
            title: query.title,
            artist: query.artist,
            album: query.album,
            duration_s: query.duration,
        },
        force_reload: query.force_reload,
        embedded: None,
        caption_track: None,
    };

    Ok(Json(ctx.resolver.resolve(&request).await?))
}

/// Full resolution request body (embedded document, caption fallback)
#[derive(Debug, Deserialize)]
pub struct ResolveBody {
    pub song: SongIdentity,
    #[serde(default)]
    pub force_reload: bool,
    #[serde(default)]
    pub embedded: Option<LyricsDocument>,
    #[serde(default)]
    pub caption_track: Option<CaptionTrack>,
}

pub async fn resolve_lyrics(
    State(ctx): State<AppContext>,
    Json(body): Json<ResolveBody>,
) -> ApiResult<Json<VersionedLyrics>> {
    let request = ResolveRequest {
        song: body.song,
        force_reload: body.force_reload,
        embedded: body.embedded,
        caption_track: body.caption_track,
    };

    Ok(Json(ctx.resolver.resolve(&request).await?))
}

#[derive(Debug, Deserialize)]
pub struct TranslateBody {
    pub song: SongIdentity,
    pub action: TranslationAction,
    pub target_language: String,
    #[serde(default)]
    pub force_reload: bool,
}

pub async fn translate(
    State(ctx): State<AppContext>,
    Json(body): Json<TranslateBody>,
) -> ApiResult<Json<LyricsDocument>> {
    // Resolve the source first so the derived document is tied to its
    // current version
    let request = ResolveRequest {
        song: body.song.clone(),
        force_reload: body.force_reload,
        embedded: None,
        caption_track: None,
    };
    let source = ctx.resolver.resolve(&request).await?;

    let document = ctx
        .translator
        .resolve(
            &body.song,
            &source,
            body.action,
            &body.target_language,
            body.force_reload,
        )
        .await?;

    Ok(Json(document))
}

pub async fn reset_cache(State(ctx): State<AppContext>) -> ApiResult<StatusCode> {
    ctx.resolver.reset_caches().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct LocalEntrySummary {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
}

pub async fn list_local(
    State(ctx): State<AppContext>,
) -> ApiResult<Json<Vec<LocalEntrySummary>>> {
    let entries = local_lyrics::list(&ctx.db)
        .await?
        .into_iter()
        .map(|(id, title, artist)| LocalEntrySummary { id, title, artist })
        .collect();
    Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
pub struct AddLocalBody {
    pub title: String,
    pub artist: String,
    pub document: LyricsDocument,
}

pub async fn add_local(
    State(ctx): State<AppContext>,
    Json(body): Json<AddLocalBody>,
) -> ApiResult<(StatusCode, Json<LocalEntrySummary>)> {
    if body.document.is_empty() {
        return Err(Error::InvalidInput("document has no lines".to_string()).into());
    }

    let entry = local_lyrics::LocalEntry {
        id: Uuid::new_v4(),
        title: body.title,
        artist: body.artist,
        document: body.document,
        stored_at_ms: time::now_ms(),
    };
    local_lyrics::insert(&ctx.db, &entry).await?;

    Ok((
        StatusCode::CREATED,
        Json(LocalEntrySummary {
            id: entry.id,
            title: entry.title,
            artist: entry.artist,
        }),
    ))
}
