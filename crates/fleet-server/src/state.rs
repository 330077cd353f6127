//! Shared application state for the metrics server.
//! Wraps the device registry so every handler works against the same
//! instance through axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use fleet_core::registry::DeviceRegistry;

#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
    pub start_time: Instant,
    pub registry: DeviceRegistry,
}

impl AppState {
    pub fn new(registry: DeviceRegistry) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                start_time: Instant::now(),
                registry,
            }),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.inner.registry
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }
}
