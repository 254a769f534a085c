//! Shared constants for end-to-end tests
//!
//! When test data changes (users, tokens, library contents),
//! update only this file.

// ============================================================================
// Test Users
// ============================================================================

/// Regular test user handle
pub const TEST_USER: &str = "testuser";

/// Session token of the regular test user
pub const TEST_USER_TOKEN: &str = "test-user-token-0123456789";

/// A second user, used to check ownership scoping
pub const OTHER_USER: &str = "otheruser";

/// Session token of the second user
pub const OTHER_USER_TOKEN: &str = "other-user-token-0123456789";

// ============================================================================
// Test Library
// ============================================================================

/// Name given to libraries imported by the tests
pub const LIBRARY_NAME: &str = "Home Collection";

/// Tracks in the fixture document
pub const LIBRARY_TRACK_COUNT: usize = 4;

/// Folders and playlists in the fixture document, ROOT included
pub const LIBRARY_PLAYLIST_NODE_COUNT: usize = 5;

/// Name of the playlist linking the streamable tracks
pub const OPENERS_PLAYLIST: &str = "Openers";

/// Audio file on disk referenced by source track "1"
pub const AUDIO_FILE_NAME: &str = "opening.mp3";

/// Size of the generated audio file
pub const TEST_AUDIO_SIZE_BYTES: usize = 1000;

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between server readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Default timeout for HTTP requests in tests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
