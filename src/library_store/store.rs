//! SQLite-backed library store.
//!
//! A single write connection carries every import transaction, so imports are
//! serialized. Reads go through a small round-robin pool of read-only
//! connections and only ever observe committed imports (WAL).

use super::models::*;
use super::schema::LIBRARY_VERSIONED_SCHEMAS;
use super::trait_def::{ImportTransaction, LibraryStore, LibraryWriter};
use crate::coercion::{parse_date_or_zero, DATE_FORMAT};
use crate::file_location::StorageKind;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

pub const DEFAULT_READ_POOL_SIZE: usize = 4;

const LIBRARY_COLUMNS: &str =
    "l.id, l.user_id, l.name, l.source, l.version, l.product_name, l.company, l.created";

const TRACK_COLUMNS: &str = "t.id, t.library_id, t.source_track_id, t.name, t.artist, \
    t.composer, t.album, t.grouping, t.genre, t.kind, t.size, t.total_time, t.disc_number, \
    t.track_number, t.year, t.average_bpm, t.date_added, t.bit_rate, t.sample_rate, \
    t.comments, t.play_count, t.rating, t.location, t.storage_kind, t.remixer, t.tonality, \
    t.label, t.mix";

#[derive(Clone)]
pub struct SqliteLibraryStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = LIBRARY_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &LIBRARY_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating library db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    if db_version < BASE_DB_VERSION as i64 {
        bail!(
            "Database has user_version {} and was not created by this server",
            db_version
        );
    }
    let mut current_version = (db_version - BASE_DB_VERSION as i64) as usize;
    if current_version >= latest_version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in LIBRARY_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating library db from version {} to {}",
                current_version, schema.version
            );
            migration_fn(&tx)?;
        }
        current_version = schema.version;
    }
    tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
    tx.commit()?;
    Ok(())
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| anyhow!("Library database connection mutex poisoned"))
}

impl SqliteLibraryStore {
    /// Opens (creating if needed) the database at `db_path`.
    ///
    /// `read_pool_size` read-only connections are opened next to the write
    /// connection. With zero, reads share the write connection.
    pub fn new<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open library database {}", db_path.display()))?;

        Self::prepare_write_conn(&mut write_conn)?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let library_count: i64 =
            write_conn.query_row("SELECT COUNT(*) FROM libraries", [], |r| r.get(0))?;
        info!(
            "Opened library database {}: {} libraries",
            db_path.display(),
            library_count
        );

        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteLibraryStore {
            read_pool,
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// A private in-memory database, reads and writes share one connection.
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        Self::prepare_write_conn(&mut conn)?;
        Ok(SqliteLibraryStore {
            read_pool: Vec::new(),
            write_conn: Arc::new(Mutex::new(conn)),
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn prepare_write_conn(conn: &mut Connection) -> Result<()> {
        // Per connection setting, cascades depend on it.
        conn.pragma_update(None, "foreign_keys", true)?;
        migrate_if_needed(conn)?;
        LIBRARY_VERSIONED_SCHEMAS[LIBRARY_VERSIONED_SCHEMAS.len() - 1]
            .validate(conn)
            .context("Library database schema validation failed")?;
        Ok(())
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        if self.read_pool.is_empty() {
            return self.write_conn.clone();
        }
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    pub(crate) fn with_read_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.get_read_conn();
        let guard = lock(&conn)?;
        f(&guard)
    }

    pub(crate) fn with_write_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        let guard = lock(&self.write_conn)?;
        f(&guard)
    }

    fn owns_library(conn: &Connection, user_id: UserId, library_id: LibraryId) -> Result<bool> {
        let found = conn
            .query_row(
                "SELECT 1 FROM libraries WHERE id = ?1 AND user_id = ?2",
                params![library_id, user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn query_tracks(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Track>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let tracks = stmt
            .query_map(params, parse_track_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }
}

fn parse_library_row(row: &Row) -> rusqlite::Result<Library> {
    Ok(Library {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        source: row.get(3)?,
        version: row.get(4)?,
        product_name: row.get(5)?,
        company: row.get(6)?,
        created: row.get(7)?,
    })
}

fn parse_track_row(row: &Row) -> rusqlite::Result<Track> {
    let date_added: String = row.get(16)?;
    let storage_kind: String = row.get(23)?;
    Ok(Track {
        id: row.get(0)?,
        library_id: row.get(1)?,
        info: TrackInfo {
            source_track_id: row.get(2)?,
            name: row.get(3)?,
            artist: row.get(4)?,
            composer: row.get(5)?,
            album: row.get(6)?,
            grouping: row.get(7)?,
            genre: row.get(8)?,
            kind: row.get(9)?,
            size: row.get(10)?,
            total_time_secs: row.get(11)?,
            disc_number: row.get(12)?,
            track_number: row.get(13)?,
            year: row.get(14)?,
            average_bpm: row.get(15)?,
            date_added: parse_date_or_zero(&date_added),
            bit_rate: row.get(17)?,
            sample_rate: row.get(18)?,
            comments: row.get(19)?,
            play_count: row.get(20)?,
            rating: row.get(21)?,
            location: row.get(22)?,
            storage_kind: StorageKind::from_db_value(&storage_kind),
            remixer: row.get(24)?,
            tonality: row.get(25)?,
            label: row.get(26)?,
            mix: row.get(27)?,
        },
    })
}

// =============================================================================
// Import transaction
// =============================================================================

pub struct SqliteImportTransaction<'a> {
    conn: MutexGuard<'a, Connection>,
    committed: bool,
}

impl<'a> SqliteImportTransaction<'a> {
    fn begin(conn: MutexGuard<'a, Connection>) -> Result<Self> {
        conn.execute_batch("BEGIN IMMEDIATE")
            .context("Failed to begin import transaction")?;
        Ok(SqliteImportTransaction {
            conn,
            committed: false,
        })
    }
}

impl LibraryWriter for SqliteImportTransaction<'_> {
    fn create_library(&mut self, library: &NewLibrary) -> Result<LibraryId> {
        self.conn.execute(
            "INSERT INTO libraries (user_id, name, source, version, product_name, company)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                library.user_id,
                library.name,
                library.source,
                library.version,
                library.product_name,
                library.company
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_track(&mut self, library_id: LibraryId, track: &TrackInfo) -> Result<TrackId> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO tracks (library_id, source_track_id, name, artist, composer, album,
                grouping, genre, kind, size, total_time, disc_number, track_number, year,
                average_bpm, date_added, bit_rate, sample_rate, comments, play_count, rating,
                location, storage_kind, remixer, tonality, label, mix)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)",
        )?;
        stmt.execute(params![
            library_id,
            track.source_track_id,
            track.name,
            track.artist,
            track.composer,
            track.album,
            track.grouping,
            track.genre,
            track.kind,
            track.size,
            track.total_time_secs,
            track.disc_number,
            track.track_number,
            track.year,
            track.average_bpm,
            track.date_added.format(DATE_FORMAT).to_string(),
            track.bit_rate,
            track.sample_rate,
            track.comments,
            track.play_count,
            track.rating,
            track.location,
            track.storage_kind.as_str(),
            track.remixer,
            track.tonality,
            track.label,
            track.mix,
        ])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_tempo_marker(
        &mut self,
        track_id: TrackId,
        position: usize,
        marker: &TempoMarker,
    ) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO tempo_markers (track_id, position, inizio, bpm, metro, battito)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        stmt.execute(params![
            track_id,
            position as i64,
            marker.inizio,
            marker.bpm,
            marker.metro,
            marker.battito
        ])?;
        Ok(())
    }

    fn insert_playlist_node(&mut self, node: &NewPlaylistNode) -> Result<PlaylistNodeId> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO playlist_nodes (library_id, parent_id, name, node_kind, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        stmt.execute(params![
            node.library_id,
            node.parent_id,
            node.name,
            node.node_kind.to_db_value(),
            node.position
        ])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_playlist_track(
        &mut self,
        playlist_id: PlaylistNodeId,
        position: usize,
        track_key: &str,
    ) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO playlist_tracks (playlist_id, position, track_key) VALUES (?1, ?2, ?3)",
        )?;
        stmt.execute(params![playlist_id, position as i64, track_key])?;
        Ok(())
    }
}

impl ImportTransaction for SqliteImportTransaction<'_> {
    fn commit(mut self: Box<Self>) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .context("Failed to commit import transaction")?;
        self.committed = true;
        debug!("Import transaction committed");
        Ok(())
    }
}

impl Drop for SqliteImportTransaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match self.conn.execute_batch("ROLLBACK") {
            Ok(()) => warn!("Import transaction rolled back"),
            Err(err) => error!("Failed to roll back import transaction: {}", err),
        }
    }
}

// =============================================================================
// LibraryStore
// =============================================================================

impl LibraryStore for SqliteLibraryStore {
    fn begin_import(&self) -> Result<Box<dyn ImportTransaction + '_>> {
        let conn = lock(&self.write_conn)?;
        Ok(Box::new(SqliteImportTransaction::begin(conn)?))
    }

    fn list_libraries(&self, user_id: UserId) -> Result<Vec<Library>> {
        self.with_read_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {} FROM libraries l WHERE l.user_id = ?1 ORDER BY l.id",
                LIBRARY_COLUMNS
            ))?;
            let libraries = stmt
                .query_map(params![user_id], parse_library_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(libraries)
        })
    }

    fn get_library(&self, user_id: UserId, library_id: LibraryId) -> Result<Option<Library>> {
        self.with_read_conn(|conn| {
            let library = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM libraries l WHERE l.id = ?1 AND l.user_id = ?2",
                        LIBRARY_COLUMNS
                    ),
                    params![library_id, user_id],
                    parse_library_row,
                )
                .optional()?;
            Ok(library)
        })
    }

    fn delete_library(&self, user_id: UserId, library_id: LibraryId) -> Result<bool> {
        self.with_write_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM libraries WHERE id = ?1 AND user_id = ?2",
                params![library_id, user_id],
            )?;
            if deleted > 0 {
                info!("Deleted library {} of user {}", library_id, user_id);
            }
            Ok(deleted > 0)
        })
    }

    fn count_library_contents(&self, library_id: LibraryId) -> Result<LibraryContentCounts> {
        self.with_read_conn(|conn| {
            let counts = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM tracks WHERE library_id = ?1),
                    (SELECT COUNT(*) FROM tempo_markers tm
                        JOIN tracks t ON t.id = tm.track_id WHERE t.library_id = ?1),
                    (SELECT COUNT(*) FROM playlist_nodes WHERE library_id = ?1),
                    (SELECT COUNT(*) FROM playlist_tracks pt
                        JOIN playlist_nodes n ON n.id = pt.playlist_id WHERE n.library_id = ?1)",
                params![library_id],
                |r| {
                    Ok(LibraryContentCounts {
                        tracks: r.get::<_, i64>(0)? as usize,
                        tempo_markers: r.get::<_, i64>(1)? as usize,
                        playlist_nodes: r.get::<_, i64>(2)? as usize,
                        playlist_tracks: r.get::<_, i64>(3)? as usize,
                    })
                },
            )?;
            Ok(counts)
        })
    }

    fn list_tracks(&self, user_id: UserId, library_id: LibraryId) -> Result<Option<Vec<Track>>> {
        self.with_read_conn(|conn| {
            if !Self::owns_library(conn, user_id, library_id)? {
                return Ok(None);
            }
            let tracks = Self::query_tracks(
                conn,
                &format!(
                    "SELECT {} FROM tracks t WHERE t.library_id = ?1 ORDER BY t.id",
                    TRACK_COLUMNS
                ),
                params![library_id],
            )?;
            Ok(Some(tracks))
        })
    }

    fn get_track_for_user(&self, user_id: UserId, track_id: TrackId) -> Result<Option<Track>> {
        self.with_read_conn(|conn| {
            let track = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM tracks t JOIN libraries l ON l.id = t.library_id
                         WHERE t.id = ?1 AND l.user_id = ?2",
                        TRACK_COLUMNS
                    ),
                    params![track_id, user_id],
                    parse_track_row,
                )
                .optional()?;
            Ok(track)
        })
    }

    fn resolve_track_key(
        &self,
        user_id: UserId,
        library_id: LibraryId,
        source_track_id: &str,
    ) -> Result<Option<Track>> {
        self.with_read_conn(|conn| {
            let track = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM tracks t JOIN libraries l ON l.id = t.library_id
                         WHERE t.library_id = ?1 AND t.source_track_id = ?2 AND l.user_id = ?3
                         ORDER BY t.id LIMIT 1",
                        TRACK_COLUMNS
                    ),
                    params![library_id, source_track_id, user_id],
                    parse_track_row,
                )
                .optional()?;
            Ok(track)
        })
    }

    fn list_tempo_markers(&self, track_id: TrackId) -> Result<Vec<TempoMarker>> {
        self.with_read_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT inizio, bpm, metro, battito FROM tempo_markers
                 WHERE track_id = ?1 ORDER BY position",
            )?;
            let markers = stmt
                .query_map(params![track_id], |r| {
                    Ok(TempoMarker {
                        inizio: r.get(0)?,
                        bpm: r.get(1)?,
                        metro: r.get(2)?,
                        battito: r.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(markers)
        })
    }

    fn list_playlist_nodes(
        &self,
        user_id: UserId,
        library_id: LibraryId,
    ) -> Result<Option<Vec<PlaylistNode>>> {
        self.with_read_conn(|conn| {
            if !Self::owns_library(conn, user_id, library_id)? {
                return Ok(None);
            }
            let mut stmt = conn.prepare_cached(
                "SELECT id, library_id, name, node_kind, parent_id, position
                 FROM playlist_nodes WHERE library_id = ?1 ORDER BY id",
            )?;
            let nodes = stmt
                .query_map(params![library_id], |r| {
                    Ok(PlaylistNode {
                        id: r.get(0)?,
                        library_id: r.get(1)?,
                        name: r.get(2)?,
                        node_kind: PlaylistNodeKind::from_db_value(r.get(3)?),
                        parent_id: r.get(4)?,
                        position: r.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(nodes))
        })
    }

    fn get_playlist_tracks(
        &self,
        user_id: UserId,
        playlist_id: PlaylistNodeId,
    ) -> Result<Option<Vec<Track>>> {
        self.with_read_conn(|conn| {
            let library_id: Option<LibraryId> = conn
                .query_row(
                    "SELECT n.library_id FROM playlist_nodes n
                     JOIN libraries l ON l.id = n.library_id
                     WHERE n.id = ?1 AND l.user_id = ?2",
                    params![playlist_id, user_id],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(library_id) = library_id else {
                return Ok(None);
            };

            // Keys resolve within the playlist's library only, unmatched keys drop out.
            let tracks = Self::query_tracks(
                conn,
                &format!(
                    "SELECT {} FROM playlist_tracks pt
                     JOIN tracks t ON t.id = (
                        SELECT MIN(id) FROM tracks
                        WHERE library_id = ?1 AND source_track_id = pt.track_key)
                     WHERE pt.playlist_id = ?2
                     ORDER BY pt.position",
                    TRACK_COLUMNS
                ),
                params![library_id, playlist_id],
            )?;
            Ok(Some(tracks))
        })
    }
}
