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

//! Dealdesk dashboard client core
//!
//! This crate provides the authorization-decision engine and the real-time
//! notification transport of the Dealdesk dashboard: role/permission
//! tables, a fail-closed access evaluator, a TTL permission cache with a
//! backend refresh protocol, the access gate consumed by the UI layer, and
//! the WebSocket notification channel with heartbeat and bounded
//! reconnect.
//!
//! Page components, widgets, and the backend API itself are external
//! collaborators; this crate only holds transient in-memory state.

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod rbac;

pub use backend::{HttpPermissionsBackend, PermissionsBackend};
pub use config::Config;
pub use error::{ClientError, ClientResult};
pub use models::User;
pub use notifications::{Notification, NotificationTransport, TransportConfig};
pub use rbac::{AccessDecision, AccessGate, AccessRequest, Permission, PermissionService, Role, Scope};
