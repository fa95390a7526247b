pub mod config;
mod conversion_routes;
mod http_layers;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use conversion_routes::conversion_routes;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use state::ServerState;
