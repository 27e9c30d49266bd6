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

//! Role-based access control for the dashboard client
//!
//! This module provides the client-side authorization stack:
//! - Static role/permission and route tables
//! - Pure, fail-closed access evaluation
//! - A TTL decision cache with a backend refresh protocol
//! - The declarative access gate consumed by the UI layer

pub mod cache;
pub mod evaluator;
pub mod gate;
pub mod permissions;
pub mod roles;
pub mod routes;
pub mod service;

pub use cache::*;
pub use evaluator::*;
pub use gate::*;
pub use permissions::*;
pub use roles::*;
pub use routes::*;
pub use service::*;
