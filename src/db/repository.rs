//! User repository for Gator.
//!
//! This module provides the user operations the commands need.

use uuid::Uuid;

use super::user::{User, UserRow};
use super::DbPool;
use crate::datetime::now_db;
use crate::{GatorError, Result};

/// Repository for user operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    ///
    /// Fails with a persistence error if the name is taken.
    pub async fn create(&self, name: &str) -> Result<User> {
        let now = now_db();
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, name, created_at, updated_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, created_at, updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(&now)
        .bind(&now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| GatorError::from_insert(e, || format!("user {name:?} already exists")))?;

        Ok(User::from(row))
    }

    /// Get a user by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// List all users ordered by name.
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Delete every user.
    ///
    /// Feeds, follows and posts go with them through `ON DELETE CASCADE`.
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM users").execute(self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_create_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let user = repo.create("alice").await.unwrap();
        assert_eq!(user.name, "alice");
        assert!(Uuid::parse_str(&user.id).is_ok());
    }

    #[tokio::test]
    async fn test_create_duplicate_user() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        repo.create("alice").await.unwrap();
        let err = repo.create("alice").await.unwrap_err();
        match err {
            GatorError::Persistence(msg) => assert!(msg.contains("already exists")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_by_name() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        let created = repo.create("bob").await.unwrap();
        let found = repo.get_by_name("bob").await.unwrap().unwrap();
        assert_eq!(found, created);
        assert!(repo.get_by_name("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_and_delete_all() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = UserRepository::new(db.pool());

        repo.create("zed").await.unwrap();
        repo.create("amy").await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["amy", "zed"]);

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert!(repo.list().await.unwrap().is_empty());
    }
}
