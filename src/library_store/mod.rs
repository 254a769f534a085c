mod models;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use schema::LIBRARY_VERSIONED_SCHEMAS;
pub use store::{SqliteImportTransaction, SqliteLibraryStore, DEFAULT_READ_POOL_SIZE};
pub use trait_def::{ImportTransaction, LibraryStore, LibraryWriter};
