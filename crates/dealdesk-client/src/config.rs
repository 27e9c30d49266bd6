// Dealdesk
// Copyright (C) 2025 Dealdesk

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Configuration management for the dashboard client core

use std::env;
use std::time::Duration;

use crate::notifications::TransportConfig;

/// Configuration for the dashboard client core
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the backend REST API
    pub api_base_url: String,

    /// WebSocket endpoint for push notifications
    pub notification_ws_url: String,

    /// Permission cache TTL in seconds
    pub cache_ttl_secs: u64,

    /// Interval between periodic permission refreshes in seconds
    pub auto_refresh_interval_secs: u64,

    /// Heartbeat interval for the notification channel in seconds
    pub heartbeat_interval_secs: u64,

    /// Maximum reconnect attempts after a non-clean close
    pub max_reconnect_attempts: u32,

    /// Upper bound on the exponential reconnect backoff in seconds
    pub reconnect_backoff_cap_secs: u64,

    /// Add random jitter to reconnect delays
    pub reconnect_jitter: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            notification_ws_url: "ws://localhost:8000/notifications/".to_string(),
            cache_ttl_secs: 300,
            auto_refresh_interval_secs: 1800,
            heartbeat_interval_secs: 30,
            max_reconnect_attempts: 5,
            reconnect_backoff_cap_secs: 30,
            reconnect_jitter: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("DEALDESK_API_BASE_URL").unwrap_or_else(|_| "http://localhost:8000/api".to_string()),

            notification_ws_url: env::var("DEALDESK_NOTIFICATION_WS_URL").unwrap_or_else(|_| "ws://localhost:8000/notifications/".to_string()),

            cache_ttl_secs: env::var("DEALDESK_CACHE_TTL_SECS").map(|v| v.parse().unwrap_or(300)).unwrap_or(300),

            auto_refresh_interval_secs: env::var("DEALDESK_AUTO_REFRESH_INTERVAL_SECS").map(|v| v.parse().unwrap_or(1800)).unwrap_or(1800),

            heartbeat_interval_secs: env::var("DEALDESK_HEARTBEAT_INTERVAL_SECS").map(|v| v.parse().unwrap_or(30)).unwrap_or(30),

            max_reconnect_attempts: env::var("DEALDESK_MAX_RECONNECT_ATTEMPTS").map(|v| v.parse().unwrap_or(5)).unwrap_or(5),

            reconnect_backoff_cap_secs: env::var("DEALDESK_RECONNECT_BACKOFF_CAP_SECS").map(|v| v.parse().unwrap_or(30)).unwrap_or(30),

            reconnect_jitter: env::var("DEALDESK_RECONNECT_JITTER").map(|v| v.parse().unwrap_or(false)).unwrap_or(false),
        }
    }

    /// Permission cache TTL as a duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Auto-refresh interval as a duration
    pub fn auto_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.auto_refresh_interval_secs)
    }

    /// Build the notification transport configuration
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            url: self.notification_ws_url.clone(),
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            max_reconnect_attempts: self.max_reconnect_attempts,
            reconnect_backoff_cap: Duration::from_secs(self.reconnect_backoff_cap_secs),
            jitter: self.reconnect_jitter,
        }
    }
}
