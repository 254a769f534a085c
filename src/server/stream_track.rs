//! Audio streaming functionality

use super::{session::Session, state::GuardedLibraryStore};
use crate::file_location::{self, content_type_for_location, LocationError};
use crate::library_store::{LibraryStore, TrackId, UserId};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, BufReader, SeekFrom, Take},
};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

const STREAM_BUFFER_SIZE: usize = 4096 * 16;

/// A `Range: bytes=<start>-[<end>]` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start_inclusive: u64,
    end_inclusive: Option<u64>,
}

impl ByteRange {
    pub fn new(start_inclusive: u64, end_inclusive: Option<u64>) -> ByteRange {
        ByteRange {
            start_inclusive,
            end_inclusive,
        }
    }

    /// `None` when the header is not a byte range or the start is not a number.
    /// An end that is not a number is treated as absent.
    pub fn parse<S: AsRef<str>>(s: S) -> Option<ByteRange> {
        let (start, end) = s.as_ref().trim().strip_prefix("bytes=")?.split_once('-')?;
        Some(ByteRange {
            start_inclusive: start.trim().parse::<u64>().ok()?,
            end_inclusive: end.trim().parse::<u64>().ok(),
        })
    }

    /// Inclusive bounds within a file of `file_size` bytes, the end clamped to
    /// the last byte. `None` if no byte of the file is covered.
    pub fn clamp_to(self, file_size: u64) -> Option<(u64, u64)> {
        let last_byte = file_size.checked_sub(1)?;
        let end = self.end_inclusive.map_or(last_byte, |end| end.min(last_byte));
        (self.start_inclusive <= end).then_some((self.start_inclusive, end))
    }
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Track not found")]
    NotFound,
    #[error("Track location is not supported")]
    UnsupportedLocation,
    #[error("Cloud provider {0} is not supported")]
    UnsupportedProvider(&'static str),
    #[error("Invalid range")]
    InvalidRange,
    #[error("Range not satisfiable")]
    RangeNotSatisfiable { file_size: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<LocationError> for StreamError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::UnsupportedLocation => StreamError::UnsupportedLocation,
            LocationError::UnsupportedProvider(provider) => {
                StreamError::UnsupportedProvider(provider)
            }
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        match self {
            StreamError::NotFound | StreamError::UnsupportedLocation => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            StreamError::UnsupportedProvider(_) => {
                (StatusCode::NOT_IMPLEMENTED, self.to_string()).into_response()
            }
            StreamError::InvalidRange => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            StreamError::RangeNotSatisfiable { file_size } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                [(header::CONTENT_RANGE, format!("bytes */{}", file_size))],
            )
                .into_response(),
            StreamError::Io(_) | StreamError::Storage(_) => {
                error!("Failed to stream track: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// An opened track, positioned at the first byte to serve.
pub struct TrackStream {
    pub content_type: &'static str,
    pub file_size: u64,
    /// Inclusive bounds served for a range request.
    pub range: Option<(u64, u64)>,
    pub reader: Take<BufReader<File>>,
}

impl TrackStream {
    pub fn content_length(&self) -> u64 {
        match self.range {
            Some((start, end)) => end - start + 1,
            None => self.file_size,
        }
    }
}

impl IntoResponse for TrackStream {
    fn into_response(self) -> Response {
        let content_length = self.content_length();
        let mut builder = Response::builder()
            .header(header::CONTENT_TYPE, self.content_type)
            .header(header::ACCEPT_RANGES, "bytes")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::CONTENT_LENGTH, content_length);
        builder = match self.range {
            Some((start, end)) => builder.status(StatusCode::PARTIAL_CONTENT).header(
                header::CONTENT_RANGE,
                format!("bytes {}-{}/{}", start, end, self.file_size),
            ),
            None => builder.status(StatusCode::OK),
        };

        // Headers are gone by the time an error shows up, ending the stream
        // makes hyper abort the connection.
        let stream = ReaderStream::with_capacity(self.reader, STREAM_BUFFER_SIZE)
            .inspect_err(|err| warn!("Track stream aborted: {}", err));

        builder
            .body(Body::from_stream(stream))
            .unwrap_or_else(|err| {
                error!("Failed to build stream response: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })
    }
}

/// Opens `track_id` for `user_id`, honoring an optional `Range` header value.
///
/// Tracks of other users are reported as [`StreamError::NotFound`] before the
/// file system is looked at.
pub async fn open_track_stream(
    store: &dyn LibraryStore,
    user_id: UserId,
    track_id: TrackId,
    range_header: Option<&str>,
) -> Result<TrackStream, StreamError> {
    let track = store
        .get_track_for_user(user_id, track_id)?
        .ok_or(StreamError::NotFound)?;

    let content_type = content_type_for_location(&track.info.location);
    let path = file_location::resolve(&track.info.location)?;
    debug!("Streaming track {} from {}", track_id, path.display());

    let mut file = match File::open(&path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("Track {} file is missing", track_id);
            return Err(StreamError::NotFound);
        }
        Err(err) => return Err(err.into()),
    };
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        debug!("Track {} location is not a regular file", track_id);
        return Err(StreamError::NotFound);
    }
    let file_size = metadata.len();

    let range = match range_header {
        None => None,
        Some(value) => {
            let requested = ByteRange::parse(value).ok_or(StreamError::InvalidRange)?;
            Some(
                requested
                    .clamp_to(file_size)
                    .ok_or(StreamError::RangeNotSatisfiable { file_size })?,
            )
        }
    };

    if let Some((start, _)) = range {
        file.seek(SeekFrom::Start(start)).await?;
    }
    let mut stream = TrackStream {
        content_type,
        file_size,
        range,
        reader: BufReader::with_capacity(STREAM_BUFFER_SIZE, file).take(0),
    };
    stream.reader.set_limit(stream.content_length());
    Ok(stream)
}

pub async fn stream_track(
    session: Session,
    State(library_store): State<GuardedLibraryStore>,
    Path(track_id): Path<TrackId>,
    headers: HeaderMap,
) -> Response {
    // A header that is not valid text cannot be a byte range.
    let range = headers
        .get(header::RANGE)
        .map(|value| value.to_str().unwrap_or_default());

    match open_track_stream(library_store.as_ref(), session.user_id, track_id, range).await {
        Ok(stream) => stream.into_response(),
        Err(err) => err.into_response(),
    }
}
