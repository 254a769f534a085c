//! Musync Server Library
//!
//! Imports DJ library exports into SQLite and streams the referenced audio
//! files back over HTTP. Exposed as a library for the binaries and tests.

pub mod coercion;
pub mod config;
pub mod file_location;
pub mod library_import;
pub mod library_store;
pub mod rekordbox;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use library_import::{import_library, ImportError, ImportSummary};
pub use library_store::{LibraryStore, SqliteLibraryStore};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use user::{AuthTokenValue, UserStore};
