use crate::file_location::StorageKind;
use chrono::NaiveDate;
use serde::Serialize;

pub type UserId = i64;
pub type LibraryId = i64;
pub type TrackId = i64;
pub type PlaylistNodeId = i64;

/// One imported export document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Library {
    pub id: LibraryId,
    pub user_id: UserId,
    pub name: String,
    pub source: String,
    pub version: String,
    pub product_name: String,
    pub company: String,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLibrary {
    pub user_id: UserId,
    pub name: String,
    pub source: String,
    pub version: String,
    pub product_name: String,
    pub company: String,
}

/// Track attributes as persisted, after coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackInfo {
    /// Identifier assigned by the exporting software. Unique only within a library.
    pub source_track_id: String,
    pub name: String,
    pub artist: String,
    pub composer: String,
    pub album: String,
    pub grouping: String,
    pub genre: String,
    pub kind: String,
    pub size: i64,
    pub total_time_secs: i64,
    pub disc_number: i32,
    pub track_number: i32,
    pub year: i32,
    pub average_bpm: f64,
    pub date_added: NaiveDate,
    pub bit_rate: i32,
    pub sample_rate: i32,
    pub comments: String,
    pub play_count: i32,
    pub rating: i32,
    pub location: String,
    pub storage_kind: StorageKind,
    pub remixer: String,
    pub tonality: String,
    pub label: String,
    pub mix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub id: TrackId,
    pub library_id: LibraryId,
    #[serde(flatten)]
    pub info: TrackInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TempoMarker {
    /// Start offset in seconds.
    pub inizio: f64,
    pub bpm: f64,
    /// Time signature, e.g. "4/4".
    pub metro: String,
    /// Beat index within the bar.
    pub battito: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistNodeKind {
    Folder,
    Playlist,
}

impl PlaylistNodeKind {
    /// Interprets a document `Type` marker. Anything but `1` is a folder.
    pub fn from_type_marker(marker: &str) -> PlaylistNodeKind {
        match crate::coercion::parse_int_or_zero(marker) {
            1 => PlaylistNodeKind::Playlist,
            _ => PlaylistNodeKind::Folder,
        }
    }

    pub fn to_db_value(self) -> i64 {
        match self {
            PlaylistNodeKind::Folder => 0,
            PlaylistNodeKind::Playlist => 1,
        }
    }

    pub fn from_db_value(value: i64) -> PlaylistNodeKind {
        match value {
            1 => PlaylistNodeKind::Playlist,
            _ => PlaylistNodeKind::Folder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistNode {
    pub id: PlaylistNodeId,
    pub library_id: LibraryId,
    pub name: String,
    pub node_kind: PlaylistNodeKind,
    pub parent_id: Option<PlaylistNodeId>,
    /// Position among siblings, in document order.
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlaylistNode {
    pub library_id: LibraryId,
    pub name: String,
    pub node_kind: PlaylistNodeKind,
    pub parent_id: Option<PlaylistNodeId>,
    pub position: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryContentCounts {
    pub tracks: usize,
    pub tempo_markers: usize,
    pub playlist_nodes: usize,
    pub playlist_tracks: usize,
}
