//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::relay::SignalHub;

#[derive(Clone)]
pub struct AppState {
    /// Room registry and relay for all WebSocket connections
    pub hub: Arc<SignalHub>,
    /// Effective configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let hub = SignalHub::new(config.trust_policy(), config.relay.connection_buffer);
        Self {
            hub: Arc::new(hub),
            config: Arc::new(config),
        }
    }
}
