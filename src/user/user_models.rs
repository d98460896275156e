//! User data models

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: usize,
    pub handle: String,
    /// Unix timestamp of account creation.
    pub created: i64,
}
