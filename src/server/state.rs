use axum::extract::FromRef;

use crate::conversion::ConversionManager;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedConversionManager = Arc<ConversionManager>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub conversion_manager: GuardedConversionManager,
    pub hash: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, conversion_manager: GuardedConversionManager) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            conversion_manager,
            hash: env!("GIT_HASH").to_string(),
        }
    }
}

impl FromRef<ServerState> for GuardedConversionManager {
    fn from_ref(input: &ServerState) -> Self {
        input.conversion_manager.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
