//! Song data models

use serde::{Deserialize, Serialize};

/// Moderation state of an uploaded song. Only public songs show up in
/// favorite listings and rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongVisibility {
    Pending,
    Public,
    Hidden,
}

impl SongVisibility {
    pub fn to_int(&self) -> i32 {
        match self {
            SongVisibility::Pending => 0,
            SongVisibility::Public => 1,
            SongVisibility::Hidden => 2,
        }
    }

    pub fn from_int(value: i32) -> Self {
        match value {
            1 => SongVisibility::Public,
            2 => SongVisibility::Hidden,
            _ => SongVisibility::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub genre: Option<String>,
    pub visibility: SongVisibility,
    pub plays_count: u64,
    pub like_count: u64,
    /// Unix timestamp of the upload.
    pub created: i64,
}

/// Input for inserting a song. The id and counters are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub genre: Option<String>,
    pub visibility: SongVisibility,
}
