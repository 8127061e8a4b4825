use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::broadcast::BroadcastEngine;
use crate::config::ServerConfig;
use crate::connections::ConnectionTable;
use crate::registry::RoomRegistry;

pub type SharedRegistry = Arc<RwLock<RoomRegistry>>;
pub type SharedConnections = Arc<RwLock<ConnectionTable>>;

/// Composition root. Owns the registry and connection table; every
/// handler and background task borrows shared handles from here, so
/// there are no process-wide globals.
#[derive(Clone)]
pub struct AppState {
    pub registry: SharedRegistry,
    pub connections: SharedConnections,
    pub broadcaster: BroadcastEngine,
    pub ws_connection_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let connections: SharedConnections = Arc::new(RwLock::new(ConnectionTable::new()));
        Self {
            registry: Arc::new(RwLock::new(RoomRegistry::new())),
            broadcaster: BroadcastEngine::new(Arc::clone(&connections)),
            connections,
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }
}

/// RAII guard for the live WebSocket connection count.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
