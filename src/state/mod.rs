use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::CoreState;
use crate::core::booking::BookingStore;
use crate::core::session::SessionRegistry;
use crate::core::state::CoreInitError;

/// Application state that can be shared across handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Core layer state: provider adapters, booking store and live sessions
    pub core_state: Arc<CoreState>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Result<Arc<Self>, CoreInitError> {
        let core_state = CoreState::new(&config).await?;
        Ok(Self::with_core(config, core_state))
    }

    /// Wrap an already built core layer
    pub fn with_core(config: ServerConfig, core_state: Arc<CoreState>) -> Arc<Self> {
        Arc::new(Self { config, core_state })
    }

    pub fn sessions(&self) -> &SessionRegistry {
        self.core_state.sessions()
    }

    pub fn bookings(&self) -> &Arc<dyn BookingStore> {
        self.core_state.bookings()
    }
}
