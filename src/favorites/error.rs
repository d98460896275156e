use thiserror::Error;

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("Song {id} not found")]
    SongNotFound { id: i64 },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}
