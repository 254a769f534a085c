//! Library HTTP routes.
//!
//! Provides endpoints for:
//! - Importing an export document as a new library
//! - Browsing libraries, tracks and the playlist tree
//! - Deleting a library with everything imported along with it
//! - Streaming track audio

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{prelude::BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::session::Session;
use super::state::{GuardedLibraryStore, ServerState};
use super::stream_track::stream_track;
use crate::file_location;
use crate::library_import::{import_library, normalize_library_name, ImportError};
use crate::library_store::{LibraryId, PlaylistNodeId, TempoMarker, Track, TrackId};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Request body for a library import
#[derive(Debug, Deserialize)]
pub struct ImportLibraryBody {
    /// Display name of the new library
    pub name: String,
    /// Base64-encoded export document
    pub file_data: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct TrackDetails {
    #[serde(flatten)]
    pub track: Track,
    pub tempo_markers: Vec<TempoMarker>,
    /// Where the file is read from when streaming, absent for locations
    /// that cannot be streamed.
    pub local_path: Option<String>,
}

fn bad_request<S: Into<String>>(message: S) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn storage_error(err: anyhow::Error) -> Response {
    error!("Library storage error: {:#}", err);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

fn json_or_not_found<T: Serialize>(result: anyhow::Result<Option<T>>) -> Response {
    match result {
        Ok(Some(value)) => Json(value).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => storage_error(err),
    }
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        match self {
            ImportError::MalformedDocument(_) | ImportError::TreeTooDeep { .. } => {
                bad_request(self.to_string())
            }
            ImportError::StorageFailure(err) => storage_error(err),
        }
    }
}

// =============================================================================
// Libraries
// =============================================================================

/// POST /libraries - Import an export document
async fn post_library(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Json(body): Json<ImportLibraryBody>,
) -> Response {
    let Some(name) = normalize_library_name(&body.name).map(str::to_string) else {
        return bad_request("Library name is required");
    };

    let document = match BASE64_STANDARD.decode(body.file_data.as_bytes()) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("Rejected import with bad file data: {}", err);
            return bad_request("file_data is not valid base64");
        }
    };

    debug!(
        "User {} importing library \"{}\" ({} bytes)",
        session.user_id,
        name,
        document.len()
    );

    let user_id = session.user_id;
    let result = tokio::task::spawn_blocking(move || {
        import_library(library_store.as_ref(), user_id, &name, &document)
    })
    .await;

    match result {
        Ok(Ok(summary)) => (StatusCode::CREATED, Json(summary)).into_response(),
        Ok(Err(err)) => {
            warn!("Import for user {} failed: {}", user_id, err);
            err.into_response()
        }
        Err(join_err) => {
            error!("Import task failed: {}", join_err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /libraries - List the user's libraries
async fn get_libraries(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
) -> Response {
    match library_store.list_libraries(session.user_id) {
        Ok(libraries) => Json(libraries).into_response(),
        Err(err) => storage_error(err),
    }
}

async fn get_library(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(library_id): Path<LibraryId>,
) -> Response {
    json_or_not_found(library_store.get_library(session.user_id, library_id))
}

/// DELETE /libraries/{id} - Delete a library and its contents
async fn delete_library(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(library_id): Path<LibraryId>,
) -> Response {
    match library_store.delete_library(session.user_id, library_id) {
        Ok(true) => {
            info!("User {} deleted library {}", session.user_id, library_id);
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => storage_error(err),
    }
}

async fn get_library_tracks(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(library_id): Path<LibraryId>,
) -> Response {
    json_or_not_found(library_store.list_tracks(session.user_id, library_id))
}

async fn get_library_playlists(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(library_id): Path<LibraryId>,
) -> Response {
    json_or_not_found(library_store.list_playlist_nodes(session.user_id, library_id))
}

/// GET /libraries/{id}/tracks/{source_track_id} - Resolve a playlist track key
async fn get_library_track_by_key(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path((library_id, source_track_id)): Path<(LibraryId, String)>,
) -> Response {
    json_or_not_found(library_store.resolve_track_key(
        session.user_id,
        library_id,
        &source_track_id,
    ))
}

// =============================================================================
// Playlists and tracks
// =============================================================================

async fn get_playlist_tracks(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(playlist_id): Path<PlaylistNodeId>,
) -> Response {
    json_or_not_found(library_store.get_playlist_tracks(session.user_id, playlist_id))
}

/// GET /tracks/{id} - Track with its tempo markers
async fn get_track(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(track_id): Path<TrackId>,
) -> Response {
    let track = match library_store.get_track_for_user(session.user_id, track_id) {
        Ok(Some(track)) => track,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(err) => return storage_error(err),
    };
    let tempo_markers = match library_store.list_tempo_markers(track.id) {
        Ok(markers) => markers,
        Err(err) => return storage_error(err),
    };
    let local_path = file_location::resolve(&track.info.location)
        .ok()
        .map(|path| path.to_string_lossy().into_owned());

    Json(TrackDetails {
        track,
        tempo_markers,
        local_path,
    })
    .into_response()
}

pub fn make_library_routes(state: ServerState) -> Router {
    Router::new()
        .route("/libraries", get(get_libraries).post(post_library))
        .route("/libraries/{id}", get(get_library).delete(delete_library))
        .route("/libraries/{id}/tracks", get(get_library_tracks))
        .route(
            "/libraries/{id}/tracks/{source_track_id}",
            get(get_library_track_by_key),
        )
        .route("/libraries/{id}/playlists", get(get_library_playlists))
        .route("/playlists/{id}/tracks", get(get_playlist_tracks))
        .route("/tracks/{id}", get(get_track))
        .route("/tracks/{id}/stream", get(stream_track))
        .with_state(state)
}
