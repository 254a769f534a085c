//! Rekordbox `DJ_PLAYLISTS` export documents.
//!
//! Decoding is a structural transcription: every attribute is kept as the raw
//! string found in the document, typed interpretation happens at import time.

mod decoder;

pub use decoder::{decode, DecodeError, MAX_PLAYLIST_DEPTH};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RekordboxDocument {
    pub version: String,
    pub product: Product,
    pub tracks: Vec<CollectionTrack>,
    pub playlists: Vec<PlaylistNode>,
}

impl RekordboxDocument {
    /// Total number of folders and playlists in the tree.
    pub fn playlist_node_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&PlaylistNode> = self.playlists.iter().collect();
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children.iter());
        }
        count
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub name: String,
    pub version: String,
    pub company: String,
}

/// A `TRACK` entry of the `COLLECTION` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionTrack {
    pub track_id: String,
    pub name: String,
    pub artist: String,
    pub composer: String,
    pub album: String,
    pub grouping: String,
    pub genre: String,
    pub kind: String,
    pub size: String,
    pub total_time: String,
    pub disc_number: String,
    pub track_number: String,
    pub year: String,
    pub average_bpm: String,
    pub date_added: String,
    pub bit_rate: String,
    pub sample_rate: String,
    pub comments: String,
    pub play_count: String,
    pub rating: String,
    pub location: String,
    pub remixer: String,
    pub tonality: String,
    pub label: String,
    pub mix: String,
    pub tempos: Vec<Tempo>,
}

/// A `TEMPO` marker nested in a collection track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tempo {
    pub inizio: String,
    pub bpm: String,
    pub metro: String,
    pub battito: String,
}

/// A `NODE` of the `PLAYLISTS` tree. `node_type` is `"0"` for folders and
/// `"1"` for playlists; only playlists carry track keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistNode {
    pub node_type: String,
    pub name: String,
    pub count: String,
    pub key_type: String,
    pub entries: String,
    pub children: Vec<PlaylistNode>,
    pub track_keys: Vec<String>,
}
