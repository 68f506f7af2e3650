//! Application state shared across routes

use dashmap::DashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::game::{ArenaHandle, ConnectionId};

/// Live WebSocket connection, joined or not
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connected_at: u64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
    pub connections: Arc<DashMap<ConnectionId, ConnectionInfo>>,
}

impl AppState {
    pub fn new(config: Config, arena: ArenaHandle) -> Self {
        Self {
            config: Arc::new(config),
            arena,
            connections: Arc::new(DashMap::new()),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
