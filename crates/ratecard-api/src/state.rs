//! Application state management
//!
//! Author: hephaex@gmail.com

use ratecard_core::config::AppConfig;
use ratecard_core::{MemoryStore, RateStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Rate tables
    pub store: Arc<dyn RateStore>,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
}

impl AppState {
    /// Create new application state over an opened store
    pub fn new(config: AppConfig, store: Arc<dyn RateStore>) -> Self {
        Self {
            config,
            store,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    /// State backed by an empty in-memory store
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::SeqCst)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(AppConfig::default())
    }
}
