use axum::extract::FromRef;

use crate::library_store::LibraryStore;
use crate::user::UserStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedLibraryStore = Arc<dyn LibraryStore>;
pub type GuardedUserStore = Arc<dyn UserStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub library_store: GuardedLibraryStore,
    pub user_store: GuardedUserStore,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        library_store: GuardedLibraryStore,
        user_store: GuardedUserStore,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            library_store,
            user_store,
        }
    }
}

impl FromRef<ServerState> for GuardedLibraryStore {
    fn from_ref(input: &ServerState) -> Self {
        input.library_store.clone()
    }
}

impl FromRef<ServerState> for GuardedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
