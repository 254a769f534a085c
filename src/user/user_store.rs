use super::AuthTokenValue;
use crate::library_store::UserId;
use anyhow::Result;

/// The minimal user surface the server depends on: handles and the session
/// tokens that identify them.
pub trait UserStore: Send + Sync {
    /// Creates a new user and returns the user id.
    fn create_user(&self, user_handle: &str) -> Result<UserId>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user_id(&self, user_handle: &str) -> Result<Option<UserId>>;

    fn add_auth_token(&self, user_id: UserId, token: &AuthTokenValue) -> Result<()>;

    /// Returns Ok(None) for unknown tokens.
    fn get_user_id_for_token(&self, token: &AuthTokenValue) -> Result<Option<UserId>>;
}
