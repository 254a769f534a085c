//! Test fixture creation for the database and media files

use super::constants::*;
use anyhow::Result;
use musync_server::library_store::SqliteLibraryStore;
use musync_server::{AuthTokenValue, UserStore};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Deterministic audio bytes, so ranges can be compared against the source.
pub fn test_audio_bytes() -> Vec<u8> {
    (0..TEST_AUDIO_SIZE_BYTES).map(|i| (i % 251) as u8).collect()
}

/// Creates a temporary directory holding the audio file and an empty
/// database with the two test users and their tokens.
/// Returns (temp_dir, db_path, media_dir)
pub fn create_test_environment() -> Result<(TempDir, PathBuf, PathBuf)> {
    let dir = TempDir::new()?;

    let media_dir = dir.path().join("media");
    fs::create_dir_all(&media_dir)?;
    fs::write(media_dir.join(AUDIO_FILE_NAME), test_audio_bytes())?;

    let db_path = dir.path().join("musync.db");
    let store = SqliteLibraryStore::new(&db_path, 1)?;
    for (handle, token) in [(TEST_USER, TEST_USER_TOKEN), (OTHER_USER, OTHER_USER_TOKEN)] {
        let user_id = store.create_user(handle)?;
        store.add_auth_token(user_id, &AuthTokenValue(token.to_string()))?;
    }

    Ok((dir, db_path, media_dir))
}

/// An export document whose local tracks live in `media_dir`.
///
/// Source track "1" is the generated audio file, "2" points at a file that
/// does not exist, "3" is stored in the cloud and "4" has a web URL.
/// Playlist "Openers" links keys 1, 2 and the unknown key 404.
pub fn library_xml(media_dir: &Path) -> String {
    let media = media_dir.display();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<DJ_PLAYLISTS Version="1.0.0">
  <PRODUCT Name="rekordbox" Version="6.7.4" Company="AlphaTheta"/>
  <COLLECTION Entries="4">
    <TRACK TrackID="1" Name="Opening" Artist="Test Band" Size="{size}" TotalTime="125"
           AverageBpm="122.00" DateAdded="2024-02-10" Location="file://localhost{media}/{audio}">
      <TEMPO Inizio="0.050" Bpm="122.00" Metro="4/4" Battito="1"/>
      <TEMPO Inizio="60.000" Bpm="124.00" Metro="4/4" Battito="3"/>
    </TRACK>
    <TRACK TrackID="2" Name="Lost" Artist="Test Band" Location="file://localhost{media}/lost.flac"/>
    <TRACK TrackID="3" Name="Up There" Location="pcloud://crate/up-there.mp3"/>
    <TRACK TrackID="4" Name="Out There" Location="https://example.com/out-there.mp3"/>
  </COLLECTION>
  <PLAYLISTS>
    <NODE Type="0" Name="ROOT" Count="3">
      <NODE Type="0" Name="Gigs" Count="1">
        <NODE Name="{openers}" Type="1" KeyType="0" Entries="3">
          <TRACK Key="1"/>
          <TRACK Key="404"/>
          <TRACK Key="2"/>
        </NODE>
      </NODE>
      <NODE Name="Remote" Type="1" KeyType="0" Entries="2">
        <TRACK Key="3"/>
        <TRACK Key="4"/>
      </NODE>
      <NODE Name="Empty" Type="1" KeyType="0" Entries="0"/>
    </NODE>
  </PLAYLISTS>
</DJ_PLAYLISTS>
"#,
        size = TEST_AUDIO_SIZE_BYTES,
        media = media,
        audio = AUDIO_FILE_NAME,
        openers = OPENERS_PLAYLIST,
    )
}
