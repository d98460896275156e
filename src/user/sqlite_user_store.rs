use super::auth::{
    AuthToken, AuthTokenValue, SharedMelodyHasher, UserAuthCredentials,
    UsernamePasswordCredentials,
};
use super::user_store::{UserAuthCredentialsStore, UserAuthTokenStore, UserStore};
use crate::schema::{AUTH_TOKEN_TABLE, USER_PASSWORD_CREDENTIALS_TABLE, USER_TABLE};
use crate::sqlite_persistence::Database;
use anyhow::{Context, Result};
use rusqlite::params;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Clone)]
pub struct SqliteUserStore {
    db: Database,
}

fn to_unix_secs(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn from_unix_secs(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

impl SqliteUserStore {
    pub fn new(db: Database) -> Self {
        SqliteUserStore { db }
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.db.lock();
        conn.execute(
            &format!("INSERT INTO {} (handle) VALUES (?1)", USER_TABLE.name),
            params![user_handle],
        )
        .with_context(|| format!("Failed to create user {}", user_handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT handle FROM {} WHERE id = ?1",
            USER_TABLE.name
        ))?;
        match stmt.query_row(params![user_id], |row| row.get(0)) {
            Ok(handle) => Ok(Some(handle)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT id FROM {} WHERE handle = ?1",
            USER_TABLE.name
        ))?;
        match stmt.query_row(params![user_handle], |row| row.get::<_, i64>(0)) {
            Ok(id) => Ok(Some(id as usize)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT u.id, u.handle, c.salt, c.hash, c.hasher \
             FROM {users} u \
             LEFT JOIN {credentials} c ON c.user_id = u.id \
             WHERE u.handle = ?1",
            users = USER_TABLE.name,
            credentials = USER_PASSWORD_CREDENTIALS_TABLE.name,
        ))?;
        let row = stmt.query_row(params![user_handle], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        });
        let (user_id, handle, salt, hash, hasher) = match row {
            Ok(x) => x,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let username_password = match (salt, hash, hasher) {
            (Some(salt), Some(hash), Some(hasher)) => Some(UsernamePasswordCredentials {
                user_id: user_id as usize,
                salt,
                hash,
                hasher: SharedMelodyHasher::from_str(&hasher)?,
            }),
            _ => None,
        };

        Ok(Some(UserAuthCredentials {
            user_id: user_id as usize,
            handle,
            username_password,
        }))
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1",
                USER_PASSWORD_CREDENTIALS_TABLE.name
            ),
            params![credentials.user_id],
        )?;
        if let Some(pw) = &credentials.username_password {
            tx.execute(
                &format!(
                    "INSERT INTO {} (user_id, salt, hash, hasher) VALUES (?1, ?2, ?3, ?4)",
                    USER_PASSWORD_CREDENTIALS_TABLE.name
                ),
                params![pw.user_id, pw.salt, pw.hash, pw.hasher.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT user_id, created, last_used, value FROM {} WHERE value = ?1",
            AUTH_TOKEN_TABLE.name
        ))?;
        match stmt.query_row(params![token.0], |row| {
            Ok(AuthToken {
                user_id: row.get::<_, i64>(0)? as usize,
                created: from_unix_secs(row.get(1)?),
                last_used: row.get::<_, Option<i64>>(2)?.map(from_unix_secs),
                value: AuthTokenValue(row.get(3)?),
            })
        }) {
            Ok(auth_token) => Ok(Some(auth_token)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let deleted = self.get_user_auth_token(token)?;
        if deleted.is_some() {
            let conn = self.db.lock();
            conn.execute(
                &format!("DELETE FROM {} WHERE value = ?1", AUTH_TOKEN_TABLE.name),
                params![token.0],
            )?;
        }
        Ok(deleted)
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            &format!(
                "UPDATE {} SET last_used = ?1 WHERE value = ?2",
                AUTH_TOKEN_TABLE.name
            ),
            params![to_unix_secs(SystemTime::now()), token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
                AUTH_TOKEN_TABLE.name
            ),
            params![
                token.user_id,
                token.value.0,
                to_unix_secs(token.created),
                token.last_used.map(to_unix_secs),
            ],
        )
        .context("Failed to add auth token")?;
        Ok(())
    }
}
