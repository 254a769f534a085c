//! SQLite schema for imported libraries.
//!
//! Every child table cascades on delete, so removing a `libraries` row removes
//! everything that was imported with it. Foreign keys are only enforced when
//! `PRAGMA foreign_keys` is on, which the store does for each connection.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

// =============================================================================
// Users
// =============================================================================

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const USER_ID_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

/// Opaque session tokens handed out by `musync-cli add-token`.
const AUTH_TOKENS_TABLE: Table = Table {
    name: "auth_tokens",
    columns: &[
        sqlite_column!("value", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_ID_FK)
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_auth_tokens_user", "user_id")],
    unique_constraints: &[],
};

// =============================================================================
// Libraries
// =============================================================================

const LIBRARIES_TABLE: Table = Table {
    name: "libraries",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&USER_ID_FK)
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("source", &SqlType::Text, non_null = true), // 'rekordbox'
        sqlite_column!("version", &SqlType::Text, non_null = true),
        sqlite_column!("product_name", &SqlType::Text, non_null = true),
        sqlite_column!("company", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_libraries_user", "user_id")],
    unique_constraints: &[],
};

const LIBRARY_ID_FK: ForeignKey = ForeignKey {
    foreign_table: "libraries",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "library_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&LIBRARY_ID_FK)
        ),
        sqlite_column!("source_track_id", &SqlType::Text, non_null = true), // unique per library only
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("composer", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text, non_null = true),
        sqlite_column!("grouping", &SqlType::Text, non_null = true),
        sqlite_column!("genre", &SqlType::Text, non_null = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("size", &SqlType::Integer, non_null = true),
        sqlite_column!("total_time", &SqlType::Integer, non_null = true), // seconds
        sqlite_column!("disc_number", &SqlType::Integer, non_null = true),
        sqlite_column!("track_number", &SqlType::Integer, non_null = true),
        sqlite_column!("year", &SqlType::Integer, non_null = true),
        sqlite_column!("average_bpm", &SqlType::Real, non_null = true),
        sqlite_column!("date_added", &SqlType::Text, non_null = true), // 'YYYY-MM-DD'
        sqlite_column!("bit_rate", &SqlType::Integer, non_null = true),
        sqlite_column!("sample_rate", &SqlType::Integer, non_null = true),
        sqlite_column!("comments", &SqlType::Text, non_null = true),
        sqlite_column!("play_count", &SqlType::Integer, non_null = true),
        sqlite_column!("rating", &SqlType::Integer, non_null = true),
        sqlite_column!("location", &SqlType::Text, non_null = true),
        sqlite_column!(
            "storage_kind",
            &SqlType::Text,
            non_null = true,
            default_value = Some("'local'")
        ), // 'local', 'cloud'
        sqlite_column!("remixer", &SqlType::Text, non_null = true),
        sqlite_column!("tonality", &SqlType::Text, non_null = true),
        sqlite_column!("label", &SqlType::Text, non_null = true),
        sqlite_column!("mix", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_tracks_library_source", "library_id, source_track_id")],
    unique_constraints: &[],
};

const TRACK_ID_FK: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TEMPO_MARKERS_TABLE: Table = Table {
    name: "tempo_markers",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "track_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACK_ID_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("inizio", &SqlType::Real, non_null = true),
        sqlite_column!("bpm", &SqlType::Real, non_null = true),
        sqlite_column!("metro", &SqlType::Text, non_null = true),
        sqlite_column!("battito", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_tempo_markers_track", "track_id, position")],
    unique_constraints: &[],
};

// =============================================================================
// Playlist tree
// =============================================================================

const PLAYLIST_NODE_ID_FK: ForeignKey = ForeignKey {
    foreign_table: "playlist_nodes",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const PLAYLIST_NODES_TABLE: Table = Table {
    name: "playlist_nodes",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "library_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&LIBRARY_ID_FK)
        ),
        sqlite_column!("parent_id", &SqlType::Integer, foreign_key = Some(&PLAYLIST_NODE_ID_FK)),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("node_kind", &SqlType::Integer, non_null = true), // 0 folder, 1 playlist
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_playlist_nodes_library", "library_id"),
        ("idx_playlist_nodes_parent", "parent_id"),
    ],
    unique_constraints: &[],
};

/// Links hold the source track id, resolved against the playlist's library on read.
const PLAYLIST_TRACKS_TABLE: Table = Table {
    name: "playlist_tracks",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "playlist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PLAYLIST_NODE_ID_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!("track_key", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_playlist_tracks_playlist", "playlist_id, position")],
    unique_constraints: &[],
};

pub const LIBRARY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USERS_TABLE,
        AUTH_TOKENS_TABLE,
        LIBRARIES_TABLE,
        TRACKS_TABLE,
        TEMPO_MARKERS_TABLE,
        PLAYLIST_NODES_TABLE,
        PLAYLIST_TRACKS_TABLE,
    ],
    migration: None,
}];
