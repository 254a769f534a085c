//! Users live in the library database so libraries can reference them.

use super::{AuthTokenValue, UserStore};
use crate::library_store::{SqliteLibraryStore, UserId};
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};
use tracing::info;

impl UserStore for SqliteLibraryStore {
    fn create_user(&self, user_handle: &str) -> Result<UserId> {
        self.with_write_conn(|conn| {
            conn.execute(
                "INSERT INTO users (handle) VALUES (?1)",
                params![user_handle],
            )
            .with_context(|| format!("Failed to create user {}", user_handle))?;
            let user_id = conn.last_insert_rowid();
            info!("Created user {} with id {}", user_handle, user_id);
            Ok(user_id)
        })
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<UserId>> {
        self.with_read_conn(|conn| {
            let user_id = conn
                .query_row(
                    "SELECT id FROM users WHERE handle = ?1",
                    params![user_handle],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(user_id)
        })
    }

    fn add_auth_token(&self, user_id: UserId, token: &AuthTokenValue) -> Result<()> {
        self.with_write_conn(|conn| {
            conn.execute(
                "INSERT INTO auth_tokens (value, user_id) VALUES (?1, ?2)",
                params![token.as_str(), user_id],
            )?;
            Ok(())
        })
    }

    fn get_user_id_for_token(&self, token: &AuthTokenValue) -> Result<Option<UserId>> {
        self.with_read_conn(|conn| {
            let user_id = conn
                .query_row(
                    "SELECT user_id FROM auth_tokens WHERE value = ?1",
                    params![token.as_str()],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(user_id)
        })
    }
}
