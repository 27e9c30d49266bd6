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

//! Real-time push notifications
//!
//! A single logical WebSocket channel per session with heartbeat,
//! bounded exponential reconnect, and synchronous listener fanout.
//! Listeners typically react by invalidating permission or query caches
//! in the surrounding application.

pub mod messages;
pub mod transport;

pub use messages::*;
pub use transport::*;
