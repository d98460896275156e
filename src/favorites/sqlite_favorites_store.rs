use super::error::FavoritesError;
use super::favorites_store::FavoritesStore;
use super::models::{
    FavoriteSong, FavoriteToggle, MostFavoritedSong, SongFavoriteStats, ToggleAction,
};
use crate::schema::{SONG_TABLE, USER_FAVORITES_TABLE};
use crate::song::SongVisibility;
use crate::sqlite_persistence::Database;
use rusqlite::{params, Connection};

#[derive(Clone)]
pub struct SqliteFavoritesStore {
    db: Database,
}

/// Mutations check song existence inside their transaction so a missing song
/// surfaces as SongNotFound instead of a foreign key violation.
fn ensure_song_exists(conn: &Connection, song_id: i64) -> Result<(), FavoritesError> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {} WHERE id = ?1", SONG_TABLE.name),
        params![song_id],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Err(FavoritesError::SongNotFound { id: song_id });
    }
    Ok(())
}

fn insert_edge(conn: &Connection, user_id: usize, song_id: i64) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        &format!(
            "INSERT INTO {} (user_id, song_id) VALUES (?1, ?2) \
             ON CONFLICT(user_id, song_id) DO NOTHING",
            USER_FAVORITES_TABLE.name
        ),
        params![user_id, song_id],
    )?;
    Ok(changed == 1)
}

fn delete_edge(conn: &Connection, user_id: usize, song_id: i64) -> Result<bool, rusqlite::Error> {
    let changed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE user_id = ?1 AND song_id = ?2",
            USER_FAVORITES_TABLE.name
        ),
        params![user_id, song_id],
    )?;
    Ok(changed == 1)
}

/// The denormalized song.like_count moves in the same transaction as the
/// edge, so counter and edge set can never drift.
fn bump_like_count(conn: &Connection, song_id: i64, delta: i64) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!(
            "UPDATE {} SET like_count = like_count + ?1 WHERE id = ?2",
            SONG_TABLE.name
        ),
        params![delta, song_id],
    )?;
    Ok(())
}

impl SqliteFavoritesStore {
    pub fn new(db: Database) -> Self {
        SqliteFavoritesStore { db }
    }
}

impl FavoritesStore for SqliteFavoritesStore {
    fn add_to_favorites(&self, user_id: usize, song_id: i64) -> Result<bool, FavoritesError> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        ensure_song_exists(&tx, song_id)?;
        let added = insert_edge(&tx, user_id, song_id)?;
        if added {
            bump_like_count(&tx, song_id, 1)?;
        }
        tx.commit()?;
        Ok(added)
    }

    fn remove_from_favorites(&self, user_id: usize, song_id: i64) -> Result<bool, FavoritesError> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        ensure_song_exists(&tx, song_id)?;
        let removed = delete_edge(&tx, user_id, song_id)?;
        if removed {
            bump_like_count(&tx, song_id, -1)?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn is_song_favorite(&self, user_id: usize, song_id: i64) -> Result<bool, FavoritesError> {
        let conn = self.db.lock();
        ensure_song_exists(&conn, song_id)?;
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND song_id = ?2",
                USER_FAVORITES_TABLE.name
            ),
            params![user_id, song_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn toggle_favorite(
        &self,
        user_id: usize,
        song_id: i64,
    ) -> Result<FavoriteToggle, FavoritesError> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        ensure_song_exists(&tx, song_id)?;

        // Insert-or-nothing first: one transaction, no read-then-write
        // window between checking the edge and mutating it.
        let toggle = if insert_edge(&tx, user_id, song_id)? {
            bump_like_count(&tx, song_id, 1)?;
            FavoriteToggle {
                favorite: true,
                action: ToggleAction::Added,
            }
        } else {
            delete_edge(&tx, user_id, song_id)?;
            bump_like_count(&tx, song_id, -1)?;
            FavoriteToggle {
                favorite: false,
                action: ToggleAction::Removed,
            }
        };
        tx.commit()?;
        Ok(toggle)
    }

    fn get_user_favorites(
        &self,
        user_id: usize,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<FavoriteSong>, FavoritesError> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT s.id, s.title, s.artist, s.genre, s.like_count, s.plays_count, f.created \
             FROM {favorites} f \
             JOIN {songs} s ON s.id = f.song_id \
             WHERE f.user_id = ?1 AND s.visibility = ?2 \
             ORDER BY f.created DESC, f.id DESC \
             LIMIT ?3 OFFSET ?4",
            favorites = USER_FAVORITES_TABLE.name,
            songs = SONG_TABLE.name,
        ))?;
        let favorites = stmt
            .query_map(
                params![user_id, SongVisibility::Public.to_int(), limit, offset],
                |row| {
                    Ok(FavoriteSong {
                        song_id: row.get(0)?,
                        title: row.get(1)?,
                        artist: row.get(2)?,
                        genre: row.get(3)?,
                        like_count: row.get(4)?,
                        plays_count: row.get(5)?,
                        favorited_at: row.get(6)?,
                    })
                },
            )?
            .collect::<Result<Vec<FavoriteSong>, _>>()?;
        Ok(favorites)
    }

    fn get_user_favorites_count(&self, user_id: usize) -> Result<u64, FavoritesError> {
        let conn = self.db.lock();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {favorites} f \
                 JOIN {songs} s ON s.id = f.song_id \
                 WHERE f.user_id = ?1 AND s.visibility = ?2",
                favorites = USER_FAVORITES_TABLE.name,
                songs = SONG_TABLE.name,
            ),
            params![user_id, SongVisibility::Public.to_int()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get_most_favorited_songs(
        &self,
        limit: u32,
    ) -> Result<Vec<MostFavoritedSong>, FavoritesError> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT s.id, s.title, s.artist, COUNT(f.id) AS favorite_count \
             FROM {favorites} f \
             JOIN {songs} s ON s.id = f.song_id \
             WHERE s.visibility = ?1 \
             GROUP BY s.id \
             ORDER BY favorite_count DESC, s.id ASC \
             LIMIT ?2",
            favorites = USER_FAVORITES_TABLE.name,
            songs = SONG_TABLE.name,
        ))?;
        let songs = stmt
            .query_map(params![SongVisibility::Public.to_int(), limit], |row| {
                Ok(MostFavoritedSong {
                    song_id: row.get(0)?,
                    title: row.get(1)?,
                    artist: row.get(2)?,
                    favorite_count: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<MostFavoritedSong>, _>>()?;
        Ok(songs)
    }

    fn get_song_favorite_stats(&self, song_id: i64) -> Result<SongFavoriteStats, FavoritesError> {
        let conn = self.db.lock();
        ensure_song_exists(&conn, song_id)?;
        let stats = conn.query_row(
            &format!(
                "SELECT COUNT(*), COUNT(DISTINCT user_id), MIN(created), MAX(created) \
                 FROM {} WHERE song_id = ?1",
                USER_FAVORITES_TABLE.name
            ),
            params![song_id],
            |row| {
                Ok(SongFavoriteStats {
                    song_id,
                    total_favorites: row.get::<_, i64>(0)? as u64,
                    unique_users_favorited: row.get::<_, i64>(1)? as u64,
                    first_favorited: row.get(2)?,
                    last_favorited: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    }

    fn get_favorites_count(&self) -> Result<u64, FavoritesError> {
        let conn = self.db.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", USER_FAVORITES_TABLE.name),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::VERSIONED_SCHEMAS;
    use crate::song::{NewSong, SongStore, SqliteSongStore};
    use crate::user::{SqliteUserStore, UserStore};
    use tempfile::TempDir;

    struct Fixture {
        favorites: SqliteFavoritesStore,
        songs: SqliteSongStore,
        users: SqliteUserStore,
        _temp_dir: TempDir,
    }

    fn create_fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("test.db"), VERSIONED_SCHEMAS).unwrap();
        Fixture {
            favorites: SqliteFavoritesStore::new(db.clone()),
            songs: SqliteSongStore::new(db.clone()),
            users: SqliteUserStore::new(db),
            _temp_dir: temp_dir,
        }
    }

    impl Fixture {
        fn add_user(&self, handle: &str) -> usize {
            self.users.create_user(handle).unwrap()
        }

        fn add_song(&self, title: &str, visibility: SongVisibility) -> i64 {
            self.songs
                .create_song(NewSong {
                    title: title.to_string(),
                    artist: "Test Artist".to_string(),
                    genre: None,
                    visibility,
                })
                .unwrap()
        }
    }

    #[test]
    fn add_is_idempotent() {
        let fx = create_fixture();
        let user = fx.add_user("ana");
        let song = fx.add_song("Bésame Mucho", SongVisibility::Public);

        assert!(fx.favorites.add_to_favorites(user, song).unwrap());
        assert!(!fx.favorites.add_to_favorites(user, song).unwrap());
        assert!(fx.favorites.is_song_favorite(user, song).unwrap());
    }

    #[test]
    fn remove_is_idempotent() {
        let fx = create_fixture();
        let user = fx.add_user("ana");
        let song = fx.add_song("Bésame Mucho", SongVisibility::Public);

        fx.favorites.add_to_favorites(user, song).unwrap();
        assert!(fx.favorites.remove_from_favorites(user, song).unwrap());
        assert!(!fx.favorites.remove_from_favorites(user, song).unwrap());
        assert!(!fx.favorites.is_song_favorite(user, song).unwrap());
    }

    #[test]
    fn toggle_round_trip() {
        let fx = create_fixture();
        let user = fx.add_user("ana");
        let song = fx.add_song("Granada", SongVisibility::Public);

        let first = fx.favorites.toggle_favorite(user, song).unwrap();
        assert!(first.favorite);
        assert_eq!(first.action, ToggleAction::Added);

        let second = fx.favorites.toggle_favorite(user, song).unwrap();
        assert!(!second.favorite);
        assert_eq!(second.action, ToggleAction::Removed);

        assert!(!fx.favorites.is_song_favorite(user, song).unwrap());
    }

    #[test]
    fn missing_song_is_reported() {
        let fx = create_fixture();
        let user = fx.add_user("ana");

        assert!(matches!(
            fx.favorites.add_to_favorites(user, 999999),
            Err(FavoritesError::SongNotFound { id: 999999 })
        ));
        assert!(matches!(
            fx.favorites.remove_from_favorites(user, 999999),
            Err(FavoritesError::SongNotFound { .. })
        ));
        assert!(matches!(
            fx.favorites.toggle_favorite(user, 999999),
            Err(FavoritesError::SongNotFound { .. })
        ));
        assert!(matches!(
            fx.favorites.is_song_favorite(user, 999999),
            Err(FavoritesError::SongNotFound { .. })
        ));
        assert!(matches!(
            fx.favorites.get_song_favorite_stats(999999),
            Err(FavoritesError::SongNotFound { .. })
        ));
    }

    #[test]
    fn stats_count_unique_users() {
        let fx = create_fixture();
        let ana = fx.add_user("ana");
        let luis = fx.add_user("luis");
        let song = fx.add_song("La Llorona", SongVisibility::Public);

        fx.favorites.add_to_favorites(ana, song).unwrap();
        fx.favorites.add_to_favorites(luis, song).unwrap();

        let stats = fx.favorites.get_song_favorite_stats(song).unwrap();
        assert_eq!(stats.total_favorites, 2);
        assert_eq!(stats.unique_users_favorited, 2);
        assert!(stats.first_favorited.is_some());
        assert!(stats.last_favorited.is_some());
        assert!(stats.first_favorited <= stats.last_favorited);
    }

    #[test]
    fn stats_are_zeroed_for_unfavorited_song() {
        let fx = create_fixture();
        let song = fx.add_song("Granada", SongVisibility::Public);

        let stats = fx.favorites.get_song_favorite_stats(song).unwrap();
        assert_eq!(
            stats,
            SongFavoriteStats {
                song_id: song,
                total_favorites: 0,
                unique_users_favorited: 0,
                first_favorited: None,
                last_favorited: None,
            }
        );
    }

    #[test]
    fn like_count_tracks_edge_set() {
        let fx = create_fixture();
        let ana = fx.add_user("ana");
        let luis = fx.add_user("luis");
        let song = fx.add_song("Cucurrucucú Paloma", SongVisibility::Public);

        fx.favorites.add_to_favorites(ana, song).unwrap();
        fx.favorites.add_to_favorites(ana, song).unwrap(); // no-op
        fx.favorites.add_to_favorites(luis, song).unwrap();
        assert_eq!(fx.songs.get_song(song).unwrap().unwrap().like_count, 2);

        fx.favorites.remove_from_favorites(ana, song).unwrap();
        fx.favorites.remove_from_favorites(ana, song).unwrap(); // no-op
        assert_eq!(fx.songs.get_song(song).unwrap().unwrap().like_count, 1);

        fx.favorites.toggle_favorite(ana, song).unwrap(); // added
        fx.favorites.toggle_favorite(luis, song).unwrap(); // removed
        let song_row = fx.songs.get_song(song).unwrap().unwrap();
        let stats = fx.favorites.get_song_favorite_stats(song).unwrap();
        assert_eq!(song_row.like_count, stats.total_favorites);
    }

    #[test]
    fn ranking_orders_by_count_then_song_id() {
        let fx = create_fixture();
        let users: Vec<usize> = (0..10).map(|i| fx.add_user(&format!("user{}", i))).collect();

        // Favorite counts per song: 10, 8, 8, 3, 1, 0
        let counts = [10usize, 8, 8, 3, 1, 0];
        let mut song_ids = Vec::new();
        for (i, count) in counts.iter().enumerate() {
            let song = fx.add_song(&format!("Song {}", i), SongVisibility::Public);
            for user in &users[..*count] {
                fx.favorites.add_to_favorites(*user, song).unwrap();
            }
            song_ids.push(song);
        }

        let top = fx.favorites.get_most_favorited_songs(5).unwrap();
        assert_eq!(top.len(), 5);
        let got: Vec<(i64, u64)> = top.iter().map(|s| (s.song_id, s.favorite_count)).collect();
        assert_eq!(
            got,
            vec![
                (song_ids[0], 10),
                (song_ids[1], 8), // ties broken by song id ascending
                (song_ids[2], 8),
                (song_ids[3], 3),
                (song_ids[4], 1),
            ]
        );

        // The never-favorited song does not appear even with a larger limit
        let all = fx.favorites.get_most_favorited_songs(50).unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn listing_filters_non_public_songs() {
        let fx = create_fixture();
        let user = fx.add_user("ana");
        let public_song = fx.add_song("Public", SongVisibility::Public);
        let pending_song = fx.add_song("Pending", SongVisibility::Pending);
        let hidden_song = fx.add_song("Hidden", SongVisibility::Hidden);

        fx.favorites.add_to_favorites(user, public_song).unwrap();
        fx.favorites.add_to_favorites(user, pending_song).unwrap();
        fx.favorites.add_to_favorites(user, hidden_song).unwrap();

        let favorites = fx.favorites.get_user_favorites(user, 10, 0).unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].song_id, public_song);

        // Pagination metadata agrees with the page contents
        assert_eq!(fx.favorites.get_user_favorites_count(user).unwrap(), 1);
    }

    #[test]
    fn listing_paginates_most_recent_first() {
        let fx = create_fixture();
        let user = fx.add_user("ana");
        let song_ids: Vec<i64> = (0..5)
            .map(|i| fx.add_song(&format!("Song {}", i), SongVisibility::Public))
            .collect();
        for song in &song_ids {
            fx.favorites.add_to_favorites(user, *song).unwrap();
        }

        // Same-second timestamps fall back to edge id descending, so the
        // listing is reverse insertion order.
        let page1 = fx.favorites.get_user_favorites(user, 2, 0).unwrap();
        let page2 = fx.favorites.get_user_favorites(user, 2, 2).unwrap();
        let page3 = fx.favorites.get_user_favorites(user, 2, 4).unwrap();
        let paged: Vec<i64> = page1
            .iter()
            .chain(page2.iter())
            .chain(page3.iter())
            .map(|f| f.song_id)
            .collect();
        let mut expected = song_ids.clone();
        expected.reverse();
        assert_eq!(paged, expected);

        assert_eq!(fx.favorites.get_user_favorites_count(user).unwrap(), 5);
    }

    #[test]
    fn favorites_are_per_user() {
        let fx = create_fixture();
        let ana = fx.add_user("ana");
        let luis = fx.add_user("luis");
        let song = fx.add_song("Volver Volver", SongVisibility::Public);

        fx.favorites.add_to_favorites(ana, song).unwrap();
        assert!(fx.favorites.is_song_favorite(ana, song).unwrap());
        assert!(!fx.favorites.is_song_favorite(luis, song).unwrap());
        assert!(fx.favorites.get_user_favorites(luis, 10, 0).unwrap().is_empty());
    }
}
