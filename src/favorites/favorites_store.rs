use super::error::FavoritesError;
use super::models::{FavoriteSong, FavoriteToggle, MostFavoritedSong, SongFavoriteStats};

pub trait FavoritesStore: Send + Sync {
    /// Adds a favorite edge for (user, song).
    /// Returns whether a new edge was created; repeating the call is a no-op
    /// reported as Ok(false).
    /// Returns Err(SongNotFound) if the song does not exist.
    fn add_to_favorites(&self, user_id: usize, song_id: i64) -> Result<bool, FavoritesError>;

    /// Removes the favorite edge for (user, song).
    /// Returns whether an edge was removed; same idempotent contract as add,
    /// in reverse.
    fn remove_from_favorites(&self, user_id: usize, song_id: i64) -> Result<bool, FavoritesError>;

    /// Returns whether the user has favorited the song. Pure read.
    fn is_song_favorite(&self, user_id: usize, song_id: i64) -> Result<bool, FavoritesError>;

    /// Inverts the favorite state for (user, song) in a single transaction
    /// and reports which way it went.
    fn toggle_favorite(
        &self,
        user_id: usize,
        song_id: i64,
    ) -> Result<FavoriteToggle, FavoritesError>;

    /// Returns a page of the user's favorites, most recently favorited
    /// first. Songs that are not public are filtered out.
    fn get_user_favorites(
        &self,
        user_id: usize,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<FavoriteSong>, FavoritesError>;

    /// Number of favorites the user would see in the listing, for
    /// pagination metadata. Applies the same visibility filter.
    fn get_user_favorites_count(&self, user_id: usize) -> Result<u64, FavoritesError>;

    /// Global ranking of public songs by favorite count, descending.
    /// Ties are broken by song id ascending. Songs nobody favorited do not
    /// appear.
    fn get_most_favorited_songs(
        &self,
        limit: u32,
    ) -> Result<Vec<MostFavoritedSong>, FavoritesError>;

    /// Aggregate stats for one song's favorites. A song nobody favorited
    /// yields zero counts, never an error.
    /// Returns Err(SongNotFound) if the song does not exist.
    fn get_song_favorite_stats(
        &self,
        song_id: i64,
    ) -> Result<SongFavoriteStats, FavoritesError>;

    /// Total number of favorite edges, used to seed the metrics gauges at
    /// startup.
    fn get_favorites_count(&self) -> Result<u64, FavoritesError>;
}
