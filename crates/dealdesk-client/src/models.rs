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

//! Shared data models and backend request/response types

use serde::{Deserialize, Serialize};

use crate::rbac::permissions::Permission;
use crate::rbac::roles::Role;

/// Authenticated dashboard user
///
/// Owned by the surrounding application's auth layer; this core only reads
/// `id` and `role` and never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier
    pub id: String,

    /// Role assigned for the session
    pub role: Role,

    /// Permissions already known for this user, if the auth payload
    /// carried them
    #[serde(default)]
    pub permissions: Option<Vec<Permission>>,
}

impl User {
    /// Create a user with no pre-known permission list
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            permissions: None,
        }
    }
}

/// Response body of `GET /auth/permissions/{user_id}/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionListResponse {
    /// Authoritative permission strings for the user
    pub permissions: Vec<String>,
}

/// Request body of `POST /auth/validate-permission/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePermissionRequest {
    pub user_id: String,
    pub permission: String,
}

/// Response body of `POST /auth/validate-permission/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatePermissionResponse {
    pub valid: bool,
}
