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

//! REST client for the authorization backend
//!
//! The backend is an external collaborator; this module owns the two calls
//! the permission service makes and hides them behind a trait so tests can
//! inject an in-memory double.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::models::{PermissionListResponse, ValidatePermissionRequest, ValidatePermissionResponse};

/// Backend operations consumed by the permission service
#[async_trait]
pub trait PermissionsBackend: Send + Sync {
    /// Fetch the authoritative permission list for a user
    async fn fetch_permissions(&self, user_id: &str) -> ClientResult<Vec<String>>;

    /// Ask the backend for a single authoritative permission answer
    async fn validate_permission(&self, user_id: &str, permission: &str) -> ClientResult<bool>;
}

/// HTTP implementation of [`PermissionsBackend`]
pub struct HttpPermissionsBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPermissionsBackend {
    /// Create a backend client against the given API base URL
    pub fn new(base_url: &str) -> ClientResult<Self> {
        // Validate up front so a bad base URL surfaces at construction,
        // not on the first permission check
        Url::parse(base_url)?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn check_status(response: &reqwest::Response) -> ClientResult<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::Backend {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unexpected status").to_string(),
            })
        }
    }
}

#[async_trait]
impl PermissionsBackend for HttpPermissionsBackend {
    async fn fetch_permissions(&self, user_id: &str) -> ClientResult<Vec<String>> {
        let url = format!("{}/auth/permissions/{}/", self.base_url, user_id);
        debug!(user_id = %user_id, "fetching permissions from backend");

        let response = self.client.get(&url).send().await?;
        Self::check_status(&response)?;

        let body: PermissionListResponse = response.json().await?;
        Ok(body.permissions)
    }

    async fn validate_permission(&self, user_id: &str, permission: &str) -> ClientResult<bool> {
        let url = format!("{}/auth/validate-permission/", self.base_url);
        debug!(user_id = %user_id, permission = %permission, "validating permission with backend");

        let request = ValidatePermissionRequest {
            user_id: user_id.to_string(),
            permission: permission.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        Self::check_status(&response)?;

        let body: ValidatePermissionResponse = response.json().await?;
        Ok(body.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        let backend = HttpPermissionsBackend::new("http://localhost:8000/api/").unwrap();
        assert_eq!(backend.base_url, "http://localhost:8000/api");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(HttpPermissionsBackend::new("not a url").is_err());
    }
}
