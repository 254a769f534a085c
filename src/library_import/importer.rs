use super::playlist_tree::{materialize, PlaylistTreeStats};
use super::ImportError;
use crate::coercion::{
    parse_date_or_zero, parse_duration_or_zero, parse_float_or_zero, parse_i64_or_zero,
    parse_int_or_zero,
};
use crate::file_location::StorageKind;
use crate::library_store::{
    LibraryId, LibraryStore, NewLibrary, TempoMarker, TrackId, TrackInfo, UserId,
};
use crate::rekordbox::{self, CollectionTrack, RekordboxDocument, Tempo};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Value of `libraries.source` for everything imported here.
pub const LIBRARY_SOURCE: &str = "rekordbox";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub library_id: LibraryId,
    pub tracks: usize,
    pub tempo_markers: usize,
    pub playlist_nodes: usize,
    pub playlist_tracks: usize,
    pub unresolved_track_keys: usize,
}

/// Decodes `document` and stores it as a new library owned by `owner`.
///
/// Nothing is written when decoding fails, and a failure while writing
/// leaves no trace of the library.
pub fn import_library(
    store: &dyn LibraryStore,
    owner: UserId,
    library_name: &str,
    document: &[u8],
) -> Result<ImportSummary, ImportError> {
    let document = rekordbox::decode(document)?;
    debug!(
        "Decoded {} document: {} tracks, {} playlist nodes",
        document.product.name,
        document.tracks.len(),
        document.playlist_node_count()
    );
    import_document(store, owner, library_name, &document)
}

pub fn import_document(
    store: &dyn LibraryStore,
    owner: UserId,
    library_name: &str,
    document: &RekordboxDocument,
) -> Result<ImportSummary, ImportError> {
    let started = Instant::now();
    let mut tx = store.begin_import()?;

    let library_id = tx.create_library(&NewLibrary {
        user_id: owner,
        name: library_name.to_string(),
        source: LIBRARY_SOURCE.to_string(),
        version: document.version.clone(),
        product_name: document.product.name.clone(),
        company: document.product.company.clone(),
    })?;
    let mut summary = ImportSummary {
        library_id,
        ..Default::default()
    };

    // First occurrence wins, matching how links are resolved on read.
    let mut track_ids: HashMap<&str, TrackId> = HashMap::with_capacity(document.tracks.len());
    for track in &document.tracks {
        let track_id = tx.insert_track(library_id, &coerce_track(track))?;
        track_ids.entry(track.track_id.as_str()).or_insert(track_id);
        summary.tracks += 1;

        for (position, tempo) in track.tempos.iter().enumerate() {
            tx.insert_tempo_marker(track_id, position, &coerce_tempo(tempo))?;
            summary.tempo_markers += 1;
        }
    }

    let mut tree_stats = PlaylistTreeStats::default();
    for (position, node) in document.playlists.iter().enumerate() {
        materialize(
            &mut *tx,
            node,
            library_id,
            None,
            position,
            &track_ids,
            &mut tree_stats,
        )?;
    }
    summary.playlist_nodes = tree_stats.nodes;
    summary.playlist_tracks = tree_stats.track_links;
    summary.unresolved_track_keys = tree_stats.unresolved_track_keys;

    tx.commit()?;

    if summary.unresolved_track_keys > 0 {
        warn!(
            "Library {} has {} playlist entries without a matching track",
            library_id, summary.unresolved_track_keys
        );
    }
    info!(
        "Imported library {} ({:?}) for user {}: {} tracks, {} tempo markers, {} playlist nodes, {} playlist entries in {:?}",
        library_id,
        library_name,
        owner,
        summary.tracks,
        summary.tempo_markers,
        summary.playlist_nodes,
        summary.playlist_tracks,
        started.elapsed()
    );
    Ok(summary)
}

fn coerce_track(track: &CollectionTrack) -> TrackInfo {
    TrackInfo {
        source_track_id: track.track_id.clone(),
        name: track.name.clone(),
        artist: track.artist.clone(),
        composer: track.composer.clone(),
        album: track.album.clone(),
        grouping: track.grouping.clone(),
        genre: track.genre.clone(),
        kind: track.kind.clone(),
        size: parse_i64_or_zero(&track.size),
        total_time_secs: parse_duration_or_zero(&track.total_time).as_secs() as i64,
        disc_number: parse_int_or_zero(&track.disc_number),
        track_number: parse_int_or_zero(&track.track_number),
        year: parse_int_or_zero(&track.year),
        average_bpm: parse_float_or_zero(&track.average_bpm),
        date_added: parse_date_or_zero(&track.date_added),
        bit_rate: parse_int_or_zero(&track.bit_rate),
        sample_rate: parse_int_or_zero(&track.sample_rate),
        comments: track.comments.clone(),
        play_count: parse_int_or_zero(&track.play_count),
        rating: parse_int_or_zero(&track.rating),
        location: track.location.clone(),
        storage_kind: StorageKind::classify(&track.location),
        remixer: track.remixer.clone(),
        tonality: track.tonality.clone(),
        label: track.label.clone(),
        mix: track.mix.clone(),
    }
}

fn coerce_tempo(tempo: &Tempo) -> TempoMarker {
    TempoMarker {
        inizio: parse_float_or_zero(&tempo.inizio),
        bpm: parse_float_or_zero(&tempo.bpm),
        metro: tempo.metro.clone(),
        battito: parse_int_or_zero(&tempo.battito),
    }
}
