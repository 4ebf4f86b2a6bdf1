//! User model for Gator.

use chrono::{DateTime, Utc};

use crate::datetime::from_db;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Opaque identifier (UUID v4).
    pub id: String,
    /// Unique user name.
    pub name: String,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Row type for users from database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            created_at: from_db(&row.created_at).unwrap_or_else(Utc::now),
            updated_at: from_db(&row.updated_at).unwrap_or_else(Utc::now),
        }
    }
}
