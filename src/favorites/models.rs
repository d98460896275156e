//! Favorites data models

use serde::{Deserialize, Serialize};

/// Which way a toggle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleAction {
    Added,
    Removed,
}

/// Outcome of a toggle: the resulting state plus the mutation that produced
/// it, echoed to clients so they can reconcile optimistic UI state without a
/// second round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FavoriteToggle {
    pub favorite: bool,
    pub action: ToggleAction,
}

/// A song in a user's favorites listing.
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteSong {
    pub song_id: i64,
    pub title: String,
    pub artist: String,
    pub genre: Option<String>,
    pub like_count: u64,
    pub plays_count: u64,
    /// Unix timestamp of when this user favorited the song.
    pub favorited_at: i64,
}

/// An entry in the global most-favorited ranking.
#[derive(Debug, Clone, Serialize)]
pub struct MostFavoritedSong {
    pub song_id: i64,
    pub title: String,
    pub artist: String,
    pub favorite_count: u64,
}

/// Per-song aggregate over the favorite edge set. A song with no favorites
/// gets zero counts and `None` timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongFavoriteStats {
    pub song_id: i64,
    pub total_favorites: u64,
    pub unique_users_favorited: u64,
    pub first_favorited: Option<i64>,
    pub last_favorited: Option<i64>,
}
