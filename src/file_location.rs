//! Track file locations as written by the exporting software.
//!
//! Locations are stored exactly as found in the document. Turning them into
//! something that can be opened happens only when a track is read back.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const LOCAL_FILE_PREFIX: &str = "file://localhost";
const BARE_FILE_PREFIX: &str = "file://";

/// Cloud schemes we recognize, with the provider name reported in errors.
const CLOUD_PROVIDERS: &[(&str, &str)] = &[("pcloud://", "pcloud")];

const CONTENT_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("flac", "audio/flac"),
    ("aac", "audio/aac"),
    ("ogg", "audio/ogg"),
];
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Cloud,
}

impl StorageKind {
    pub fn classify(location: &str) -> StorageKind {
        if cloud_provider(location).is_some() {
            StorageKind::Cloud
        } else {
            StorageKind::Local
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::Local => "local",
            StorageKind::Cloud => "cloud",
        }
    }

    pub fn from_db_value(value: &str) -> StorageKind {
        match value {
            "cloud" => StorageKind::Cloud,
            _ => StorageKind::Local,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocationError {
    #[error("Unsupported track location")]
    UnsupportedLocation,
    #[error("Cloud provider {0} is not supported")]
    UnsupportedProvider(&'static str),
}

/// How the host operating system spells absolute paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Posix,
    DriveLetter,
}

impl PathStyle {
    pub fn native() -> PathStyle {
        if cfg!(windows) {
            PathStyle::DriveLetter
        } else {
            PathStyle::Posix
        }
    }
}

/// Resolves a stored location into a path on this machine.
pub fn resolve(location: &str) -> Result<PathBuf, LocationError> {
    if let Some(provider) = cloud_provider(location) {
        return Err(LocationError::UnsupportedProvider(provider));
    }
    normalize_local_path(location, PathStyle::native())
}

/// Decodes a `file://` location and rewrites it for the given path style.
///
/// `file://localhost/C:/Music/a%20b.mp3` becomes `C:\Music\a b.mp3` with
/// [`PathStyle::DriveLetter`] and `/C:/Music/a b.mp3` with [`PathStyle::Posix`].
pub fn normalize_local_path(location: &str, style: PathStyle) -> Result<PathBuf, LocationError> {
    let encoded = location
        .strip_prefix(LOCAL_FILE_PREFIX)
        .or_else(|| location.strip_prefix(BARE_FILE_PREFIX))
        .ok_or(LocationError::UnsupportedLocation)?;
    let decoded =
        urlencoding::decode(encoded).map_err(|_| LocationError::UnsupportedLocation)?;
    // Anything before the first slash is a host other than this machine.
    if !decoded.starts_with('/') {
        return Err(LocationError::UnsupportedLocation);
    }

    match style {
        PathStyle::DriveLetter if has_drive_letter(&decoded) => {
            Ok(PathBuf::from(decoded[1..].replace('/', "\\")))
        }
        _ => Ok(PathBuf::from(decoded.into_owned())),
    }
}

/// MIME type from the location's extension, whatever the storage kind.
pub fn content_type_for_location(location: &str) -> &'static str {
    let Some(extension) = Path::new(location).extension().and_then(|e| e.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    CONTENT_TYPES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(extension))
        .map(|(_, content_type)| *content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

fn cloud_provider(location: &str) -> Option<&'static str> {
    CLOUD_PROVIDERS
        .iter()
        .find(|(prefix, _)| location.starts_with(prefix))
        .map(|(_, provider)| *provider)
}

// "/C:/..." as produced by encoding a drive-letter path into a URI
fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':'
}
