//! LibraryStore trait definition.

use super::models::*;
use anyhow::Result;

/// Writes performed while importing one library.
pub trait LibraryWriter {
    fn create_library(&mut self, library: &NewLibrary) -> Result<LibraryId>;

    fn insert_track(&mut self, library_id: LibraryId, track: &TrackInfo) -> Result<TrackId>;

    /// `position` is the marker's index within its track, in document order.
    fn insert_tempo_marker(
        &mut self,
        track_id: TrackId,
        position: usize,
        marker: &TempoMarker,
    ) -> Result<()>;

    fn insert_playlist_node(&mut self, node: &NewPlaylistNode) -> Result<PlaylistNodeId>;

    /// Stores the link verbatim, `track_key` is not checked against the tracks.
    fn insert_playlist_track(
        &mut self,
        playlist_id: PlaylistNodeId,
        position: usize,
        track_key: &str,
    ) -> Result<()>;
}

/// An open write transaction. Dropping it without calling [`commit`] rolls
/// back everything written through it.
///
/// [`commit`]: ImportTransaction::commit
pub trait ImportTransaction: LibraryWriter {
    fn commit(self: Box<Self>) -> Result<()>;
}

/// Storage backend for imported libraries.
///
/// Reads taking a `user_id` are ownership scoped: a library, playlist or
/// track owned by someone else is reported exactly like a missing one.
pub trait LibraryStore: Send + Sync {
    // =========================================================================
    // Import
    // =========================================================================

    /// Starts the single transaction an import writes through.
    fn begin_import(&self) -> Result<Box<dyn ImportTransaction + '_>>;

    // =========================================================================
    // Libraries
    // =========================================================================

    fn list_libraries(&self, user_id: UserId) -> Result<Vec<Library>>;

    fn get_library(&self, user_id: UserId, library_id: LibraryId) -> Result<Option<Library>>;

    /// Deletes the library and everything imported with it. Returns false if
    /// the user owns no such library.
    fn delete_library(&self, user_id: UserId, library_id: LibraryId) -> Result<bool>;

    fn count_library_contents(&self, library_id: LibraryId) -> Result<LibraryContentCounts>;

    // =========================================================================
    // Tracks
    // =========================================================================

    /// Tracks in document order, `None` if the library is not the user's.
    fn list_tracks(&self, user_id: UserId, library_id: LibraryId) -> Result<Option<Vec<Track>>>;

    fn get_track_for_user(&self, user_id: UserId, track_id: TrackId) -> Result<Option<Track>>;

    fn list_tempo_markers(&self, track_id: TrackId) -> Result<Vec<TempoMarker>>;

    /// Resolves a playlist track key within one library. When the document
    /// repeated a source id, the first imported track is returned.
    fn resolve_track_key(
        &self,
        user_id: UserId,
        library_id: LibraryId,
        source_track_id: &str,
    ) -> Result<Option<Track>>;

    // =========================================================================
    // Playlists
    // =========================================================================

    /// Folders and playlists in creation order, `None` if the library is not the user's.
    fn list_playlist_nodes(
        &self,
        user_id: UserId,
        library_id: LibraryId,
    ) -> Result<Option<Vec<PlaylistNode>>>;

    /// Resolves the playlist's links against its own library. Keys without a
    /// matching track are skipped.
    fn get_playlist_tracks(
        &self,
        user_id: UserId,
        playlist_id: PlaylistNodeId,
    ) -> Result<Option<Vec<Track>>>;
}
