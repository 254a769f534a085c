mod auth;
mod sqlite_user_store;
mod user_store;

pub use auth::AuthTokenValue;
pub use user_store::UserStore;
