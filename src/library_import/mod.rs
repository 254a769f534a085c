//! Turns an uploaded export document into a persisted library.

mod importer;
mod playlist_tree;

pub use importer::{import_document, import_library, ImportSummary, LIBRARY_SOURCE};
pub use playlist_tree::{materialize, PlaylistTreeStats};

use crate::rekordbox::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0}")]
    MalformedDocument(#[from] DecodeError),
    #[error("Playlist tree is deeper than {max} levels")]
    TreeTooDeep { max: usize },
    #[error("Failed to store library: {0:#}")]
    StorageFailure(#[from] anyhow::Error),
}

/// Trims a requested library name, `None` if nothing is left.
pub fn normalize_library_name(name: &str) -> Option<&str> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
