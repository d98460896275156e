use super::song_models::{NewSong, Song, SongVisibility};
use super::song_store::SongStore;
use crate::schema::SONG_TABLE;
use crate::sqlite_persistence::Database;
use anyhow::{Context, Result};
use rusqlite::{params, Row};

#[derive(Clone)]
pub struct SqliteSongStore {
    db: Database,
}

impl SqliteSongStore {
    pub fn new(db: Database) -> Self {
        SqliteSongStore { db }
    }

    fn song_from_row(row: &Row) -> Result<Song, rusqlite::Error> {
        Ok(Song {
            id: row.get(0)?,
            title: row.get(1)?,
            artist: row.get(2)?,
            genre: row.get(3)?,
            visibility: SongVisibility::from_int(row.get(4)?),
            plays_count: row.get(5)?,
            like_count: row.get(6)?,
            created: row.get(7)?,
        })
    }
}

impl SongStore for SqliteSongStore {
    fn create_song(&self, song: NewSong) -> Result<i64> {
        let conn = self.db.lock();
        conn.execute(
            &format!(
                "INSERT INTO {} (title, artist, genre, visibility) VALUES (?1, ?2, ?3, ?4)",
                SONG_TABLE.name
            ),
            params![song.title, song.artist, song.genre, song.visibility.to_int()],
        )
        .with_context(|| format!("Failed to create song {}", song.title))?;
        Ok(conn.last_insert_rowid())
    }

    fn get_song(&self, song_id: i64) -> Result<Option<Song>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, title, artist, genre, visibility, plays_count, like_count, created \
             FROM {} WHERE id = ?1",
            SONG_TABLE.name
        ))?;
        let song = stmt
            .query_row(params![song_id], Self::song_from_row)
            .map(Some)
            .or_else(|err| match err {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(song)
    }

    fn set_song_visibility(&self, song_id: i64, visibility: SongVisibility) -> Result<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            &format!("UPDATE {} SET visibility = ?1 WHERE id = ?2", SONG_TABLE.name),
            params![visibility.to_int(), song_id],
        )?;
        Ok(changed == 1)
    }

    fn record_play(&self, song_id: i64) -> Result<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET plays_count = plays_count + 1 WHERE id = ?1",
                SONG_TABLE.name
            ),
            params![song_id],
        )?;
        Ok(changed == 1)
    }

    fn get_songs_count(&self) -> Result<u64> {
        let conn = self.db.lock();
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", SONG_TABLE.name), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}
