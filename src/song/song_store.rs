use super::song_models::{NewSong, Song, SongVisibility};
use anyhow::Result;

pub trait SongStore: Send + Sync {
    /// Inserts a new song and returns its id.
    fn create_song(&self, song: NewSong) -> Result<i64>;

    /// Returns the song with the given id.
    /// Returns Ok(None) if the song does not exist.
    /// Returns Err if there is a database error.
    fn get_song(&self, song_id: i64) -> Result<Option<Song>>;

    /// Updates the moderation state of a song.
    /// Returns false if the song does not exist.
    fn set_song_visibility(&self, song_id: i64, visibility: SongVisibility) -> Result<bool>;

    /// Bumps the play counter of a song.
    /// Returns false if the song does not exist.
    fn record_play(&self, song_id: i64) -> Result<bool>;

    /// Total number of songs, used to seed the metrics gauges at startup.
    fn get_songs_count(&self) -> Result<u64>;
}
