//! Test fixture creation: a temporary database pre-populated with two user
//! accounts and a handful of songs.

use super::constants::*;
use anyhow::Result;
use sharedmelody_server::schema::VERSIONED_SCHEMAS;
use sharedmelody_server::song::{NewSong, SongVisibility};
use sharedmelody_server::user::auth::UsernamePasswordCredentials;
use sharedmelody_server::user::{UserAuthCredentialsStore, UserAuthCredentials};
use sharedmelody_server::{Database, SongStore, SqliteSongStore, SqliteUserStore, UserStore};
use std::path::PathBuf;
use tempfile::TempDir;

fn create_user_with_password(store: &SqliteUserStore, handle: &str, password: &str) -> Result<()> {
    let user_id = store.create_user(handle)?;
    let credentials = UsernamePasswordCredentials::from_plain_password(user_id, password)?;
    store.update_user_auth_credentials(UserAuthCredentials {
        user_id,
        handle: handle.to_string(),
        username_password: Some(credentials),
    })?;
    Ok(())
}

/// Creates a temporary database with TEST_USER and OTHER_USER plus three
/// public songs and one pending song (see constants for ids).
/// Returns (temp_dir, db_path).
pub fn create_test_db() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("sharedmelody.db");

    let db = Database::open(&db_path, VERSIONED_SCHEMAS)?;
    let user_store = SqliteUserStore::new(db.clone());
    let song_store = SqliteSongStore::new(db);

    create_user_with_password(&user_store, TEST_USER, TEST_PASS)?;
    create_user_with_password(&user_store, OTHER_USER, OTHER_PASS)?;

    let songs = [
        ("Bésame Mucho", "Consuelo Velázquez", SongVisibility::Public),
        ("La Llorona", "Tradicional", SongVisibility::Public),
        ("Granada", "Agustín Lara", SongVisibility::Public),
        ("Demo sin moderar", "Anónimo", SongVisibility::Pending),
    ];
    for (title, artist, visibility) in songs {
        song_store.create_song(NewSong {
            title: title.to_string(),
            artist: artist.to_string(),
            genre: Some("bolero".to_string()),
            visibility,
        })?;
    }

    Ok((dir, db_path))
}
