mod error;
mod favorites_store;
mod models;
mod sqlite_favorites_store;

pub use error::FavoritesError;
pub use favorites_store::FavoritesStore;
pub use models::{
    FavoriteSong, FavoriteToggle, MostFavoritedSong, SongFavoriteStats, ToggleAction,
};
pub use sqlite_favorites_store::SqliteFavoritesStore;
