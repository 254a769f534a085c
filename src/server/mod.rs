pub mod config;
mod http_layers;
mod library_routes;
pub mod server;
pub(self) mod session;
pub mod state;
pub mod stream_track;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use session::{Session, COOKIE_SESSION_TOKEN_KEY, HEADER_SESSION_TOKEN_KEY};
