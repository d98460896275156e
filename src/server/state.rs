use axum::extract::FromRef;

use super::ServerConfig;
use crate::favorites::FavoritesStore;
use crate::song::SongStore;
use crate::user::UserStore;
use std::sync::Arc;
use std::time::Instant;

pub type GuardedSongStore = Arc<dyn SongStore>;
pub type GuardedFavoritesStore = Arc<dyn FavoritesStore>;
pub type GuardedUserStore = Arc<dyn UserStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub song_store: GuardedSongStore,
    pub favorites_store: GuardedFavoritesStore,
    pub user_store: GuardedUserStore,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedSongStore {
    fn from_ref(input: &ServerState) -> Self {
        input.song_store.clone()
    }
}

impl FromRef<ServerState> for GuardedFavoritesStore {
    fn from_ref(input: &ServerState) -> Self {
        input.favorites_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
