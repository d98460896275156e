//! Table definitions and version history for the SharedMelody database.
//!
//! All tables live in a single SQLite file so the favorite edge can carry
//! real foreign keys to both `user` and `song`.

use crate::sql_column;
use crate::sqlite_persistence::{FkRef, OnDelete, SchemaVersion, SqlType, TableDef, UNIX_NOW};
use rusqlite::{params, Connection};

const USER_FK: FkRef = FkRef {
    table: "user",
    column: "id",
    on_delete: OnDelete::Cascade,
};

const SONG_FK: FkRef = FkRef {
    table: "song",
    column: "id",
    on_delete: OnDelete::Cascade,
};

/// V 0
pub const USER_TABLE: TableDef = TableDef {
    name: "user",
    columns: &[
        sql_column!("id", SqlType::Integer, primary_key = true, unique = true),
        sql_column!("handle", SqlType::Text, not_null = true, unique = true),
        sql_column!("created", SqlType::Integer, default_expr = Some(UNIX_NOW)),
    ],
    uniques: &[],
    indices: &[("idx_user_handle", "handle")],
};

pub const AUTH_TOKEN_TABLE: TableDef = TableDef {
    name: "auth_token",
    columns: &[
        sql_column!(
            "user_id",
            SqlType::Integer,
            not_null = true,
            references = Some(&USER_FK)
        ),
        sql_column!("value", SqlType::Text, not_null = true, unique = true),
        sql_column!("created", SqlType::Integer, default_expr = Some(UNIX_NOW)),
        sql_column!("last_used", SqlType::Integer),
    ],
    uniques: &[],
    indices: &[("idx_auth_token_value", "value")],
};

pub const USER_PASSWORD_CREDENTIALS_TABLE: TableDef = TableDef {
    name: "user_password_credentials",
    columns: &[
        sql_column!(
            "user_id",
            SqlType::Integer,
            not_null = true,
            references = Some(&USER_FK)
        ),
        sql_column!("salt", SqlType::Text, not_null = true),
        sql_column!("hash", SqlType::Text, not_null = true),
        sql_column!("hasher", SqlType::Text, not_null = true),
        sql_column!("created", SqlType::Integer, default_expr = Some(UNIX_NOW)),
    ],
    uniques: &[],
    indices: &[],
};

const SONG_TABLE_V_0: TableDef = TableDef {
    name: "song",
    columns: &[
        sql_column!("id", SqlType::Integer, primary_key = true, unique = true),
        sql_column!("title", SqlType::Text, not_null = true),
        sql_column!("artist", SqlType::Text, not_null = true),
        sql_column!("genre", SqlType::Text),
        sql_column!("visibility", SqlType::Integer, not_null = true),
        sql_column!("plays_count", SqlType::Integer, not_null = true, default_expr = Some("0")),
        sql_column!("created", SqlType::Integer, default_expr = Some(UNIX_NOW)),
    ],
    uniques: &[],
    indices: &[("idx_song_visibility", "visibility")],
};

pub const USER_FAVORITES_TABLE: TableDef = TableDef {
    name: "user_favorites",
    columns: &[
        sql_column!("id", SqlType::Integer, primary_key = true, not_null = true, unique = true),
        sql_column!(
            "user_id",
            SqlType::Integer,
            not_null = true,
            references = Some(&USER_FK)
        ),
        sql_column!(
            "song_id",
            SqlType::Integer,
            not_null = true,
            references = Some(&SONG_FK)
        ),
        sql_column!("created", SqlType::Integer, default_expr = Some(UNIX_NOW)),
    ],
    // At most one favorite edge per (user, song); the idempotent insert
    // leans on this constraint.
    uniques: &[&["user_id", "song_id"]],
    indices: &[
        ("idx_user_favorites_user_id", "user_id"),
        ("idx_user_favorites_song_id", "song_id"),
    ],
};

/// V 1: denormalized like counter on song, kept in step with the favorite
/// edge set by the favorites store. like_count sits after created because
/// ALTER TABLE appends new columns; the declared order must match both the
/// migrated and the freshly created shape.
pub const SONG_TABLE: TableDef = TableDef {
    name: "song",
    columns: &[
        sql_column!("id", SqlType::Integer, primary_key = true, unique = true),
        sql_column!("title", SqlType::Text, not_null = true),
        sql_column!("artist", SqlType::Text, not_null = true),
        sql_column!("genre", SqlType::Text),
        sql_column!("visibility", SqlType::Integer, not_null = true),
        sql_column!("plays_count", SqlType::Integer, not_null = true, default_expr = Some("0")),
        sql_column!("created", SqlType::Integer, default_expr = Some(UNIX_NOW)),
        sql_column!("like_count", SqlType::Integer, not_null = true, default_expr = Some("0")),
    ],
    uniques: &[],
    indices: &[("idx_song_visibility", "visibility")],
};

pub const VERSIONED_SCHEMAS: &[SchemaVersion] = &[
    SchemaVersion {
        version: 0,
        tables: &[
            USER_TABLE,
            AUTH_TOKEN_TABLE,
            USER_PASSWORD_CREDENTIALS_TABLE,
            SONG_TABLE_V_0,
            USER_FAVORITES_TABLE,
        ],
        migration: None,
    },
    SchemaVersion {
        version: 1,
        tables: &[
            USER_TABLE,
            AUTH_TOKEN_TABLE,
            USER_PASSWORD_CREDENTIALS_TABLE,
            SONG_TABLE,
            USER_FAVORITES_TABLE,
        ],
        migration: Some(|conn: &Connection| {
            conn.execute(
                "ALTER TABLE song ADD COLUMN like_count INTEGER NOT NULL DEFAULT 0",
                params![],
            )?;
            // Backfill from the edge table so the counter starts exact
            conn.execute(
                "UPDATE song SET like_count = \
                 (SELECT COUNT(*) FROM user_favorites WHERE song_id = song.id)",
                params![],
            )?;
            Ok(())
        }),
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite_persistence::{Database, BASE_DB_VERSION};
    use rusqlite::Connection;
    use tempfile::TempDir;

    #[test]
    fn test_migration_v0_to_v1() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_migration.db");

        // Create a V0 database manually
        {
            let conn = Connection::open(&db_path).unwrap();
            VERSIONED_SCHEMAS[0].create(&conn).unwrap();

            conn.execute("INSERT INTO user (handle) VALUES (?1)", params!["ana"])
                .unwrap();
            conn.execute("INSERT INTO user (handle) VALUES (?1)", params!["luis"])
                .unwrap();
            conn.execute(
                "INSERT INTO song (title, artist, visibility) VALUES (?1, ?2, ?3)",
                params!["Cielito Lindo", "Quirino Mendoza", 1],
            )
            .unwrap();
            let song_id = conn.last_insert_rowid();

            conn.execute(
                "INSERT INTO user_favorites (user_id, song_id) VALUES (?1, ?2)",
                params![1, song_id],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO user_favorites (user_id, song_id) VALUES (?1, ?2)",
                params![2, song_id],
            )
            .unwrap();

            let db_version: i64 = conn
                .query_row("PRAGMA user_version;", [], |row| row.get(0))
                .unwrap();
            assert_eq!(db_version, BASE_DB_VERSION as i64);
        }

        // Reopening migrates to V1 and backfills the counter
        let db = Database::open(&db_path, VERSIONED_SCHEMAS).unwrap();
        {
            let conn = db.lock();
            let db_version: i64 = conn
                .query_row("PRAGMA user_version;", [], |row| row.get(0))
                .unwrap();
            assert_eq!(db_version, BASE_DB_VERSION as i64 + 1);

            let like_count: i64 = conn
                .query_row("SELECT like_count FROM song WHERE id = 1", [], |row| {
                    row.get(0)
                })
                .unwrap();
            assert_eq!(like_count, 2);
        }
    }
}
