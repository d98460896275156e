mod song_models;
mod song_store;
mod sqlite_song_store;

pub use song_models::{NewSong, Song, SongVisibility};
pub use song_store::SongStore;
pub use sqlite_song_store::SqliteSongStore;
