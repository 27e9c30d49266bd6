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

//! Cached permission checks and the backend refresh protocol
//!
//! [`PermissionService`] wraps the pure evaluator with the TTL cache and
//! talks to the backend for authoritative answers. Backend failures never
//! surface to callers: every check falls back to the local tables.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::backend::PermissionsBackend;
use crate::models::User;
use crate::rbac::cache::{PermissionCache, DEFAULT_TTL};
use crate::rbac::evaluator;
use crate::rbac::permissions::{Permission, Scope};
use crate::rbac::routes;

/// Default interval between periodic permission refreshes
pub const DEFAULT_AUTO_REFRESH_INTERVAL: Duration = Duration::from_secs(1800);

type RefreshFuture = Shared<Pin<Box<dyn Future<Output = ()> + Send>>>;

/// Cache key for a permission check
pub(crate) fn permission_key(user_id: &str, permission: Permission) -> String {
    format!("{}:permission:{}", user_id, permission)
}

/// Cache key for a route check
pub(crate) fn route_key(user_id: &str, path: &str) -> String {
    format!("{}:route:{}", user_id, path)
}

/// Cache key for a resource-scope check
pub(crate) fn resource_key(user_id: &str, permission: Permission, user_scope: Option<Scope>, resource_scope: Option<Scope>) -> String {
    let fmt_scope = |scope: Option<Scope>| scope.map(|s| s.as_str()).unwrap_or("unset");
    format!("{}:resource:{}:{}:{}", user_id, permission, fmt_scope(user_scope), fmt_scope(resource_scope))
}

/// Per-session permission service
///
/// Explicitly constructed and shared by cloning; tests instantiate
/// isolated instances instead of touching hidden global state.
#[derive(Clone)]
pub struct PermissionService {
    /// Decision cache
    cache: Arc<PermissionCache>,

    /// Authorization backend
    backend: Arc<dyn PermissionsBackend>,

    /// Entry lifetime for cached decisions
    ttl: Duration,

    /// In-flight refresh shared by concurrent callers
    refresh_inflight: Arc<Mutex<Option<RefreshFuture>>>,
}

impl PermissionService {
    /// Create a service with the default TTL
    pub fn new(backend: Arc<dyn PermissionsBackend>) -> Self {
        Self {
            cache: Arc::new(PermissionCache::new()),
            backend,
            ttl: DEFAULT_TTL,
            refresh_inflight: Arc::new(Mutex::new(None)),
        }
    }

    /// Override the cache TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Access the underlying cache
    pub fn cache(&self) -> &Arc<PermissionCache> {
        &self.cache
    }

    /// Return the cached decision for a key, or compute and store it
    ///
    /// Concurrent calls for the same key are not deduplicated: both
    /// compute and the last write wins. Recomputation is local and cheap,
    /// so this looseness is accepted; only [`Self::refresh_permissions`]
    /// carries single-flight protection.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = bool>,
    {
        if let Some(value) = self.cache.get(key) {
            return value;
        }

        let value = compute().await;
        self.cache.set(key.to_string(), value, self.ttl);
        value
    }

    /// Cached permission check
    pub async fn has_permission(&self, user: &User, permission: Permission) -> bool {
        let role = user.role;
        self.get_or_compute(&permission_key(&user.id, permission), || async move { evaluator::has_permission(role, permission) })
            .await
    }

    /// Cached route-access check
    pub async fn can_access_route(&self, user: &User, path: &str) -> bool {
        let role = user.role;
        self.get_or_compute(&route_key(&user.id, path), || async move { evaluator::can_access_route(role, path) }).await
    }

    /// Cached resource-scope check
    pub async fn can_access_resource(&self, user: &User, permission: Permission, user_scope: Option<Scope>, resource_scope: Option<Scope>) -> bool {
        let role = user.role;
        self.get_or_compute(&resource_key(&user.id, permission, user_scope, resource_scope), || async move {
            evaluator::can_access_resource(role, permission, user_scope, resource_scope)
        })
        .await
    }

    /// Refresh the user's cache from the backend
    ///
    /// Single-flight: concurrent callers await the same in-flight run, so
    /// exactly one fetch reaches the backend. Failures are logged and
    /// swallowed; subsequent checks fall back to local evaluation.
    pub async fn refresh_permissions(&self, user: &User) {
        let (refresh, owner) = {
            let mut slot = self.refresh_inflight.lock().await;
            match slot.as_ref() {
                Some(inflight) => (inflight.clone(), false),
                None => {
                    let service = self.clone();
                    let user = user.clone();
                    let refresh: RefreshFuture = async move { service.do_refresh(&user).await }.boxed().shared();
                    *slot = Some(refresh.clone());
                    (refresh, true)
                }
            }
        };

        refresh.await;

        if owner {
            self.refresh_inflight.lock().await.take();
        }
    }

    async fn do_refresh(&self, user: &User) {
        debug!(user_id = %user.id, "refreshing permissions from backend");

        // Clear before repopulating so no stale entry survives a refresh
        self.cache.remove_user_entries(&user.id);

        let permissions = match self.backend.fetch_permissions(&user.id).await {
            Ok(permissions) => permissions,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "permission refresh failed, falling back to local tables");
                return;
            }
        };

        for raw in &permissions {
            match Permission::parse(raw) {
                Some(permission) => self.cache.set(permission_key(&user.id, permission), true, self.ttl),
                None => warn!(user_id = %user.id, permission = %raw, "unknown permission in backend response, skipping"),
            }
        }

        // Pre-warm route decisions so navigation checks hit the cache
        for rule in routes::ROUTE_RULES {
            let allowed = evaluator::can_access_route(user.role, rule.path);
            self.cache.set(route_key(&user.id, rule.path), allowed, self.ttl);
        }

        debug!(user_id = %user.id, permission_count = permissions.len(), "permission cache refreshed");
    }

    /// Check several permissions concurrently
    ///
    /// Each item resolves independently; one item cannot poison the
    /// batch.
    pub async fn check_multiple_permissions(&self, user: &User, permissions: &[Permission]) -> HashMap<Permission, bool> {
        let checks = permissions.iter().map(|&permission| {
            let service = self.clone();
            let user = user.clone();
            async move { (permission, service.has_permission(&user, permission).await) }
        });

        join_all(checks).await.into_iter().collect()
    }

    /// Ask the backend for a single authoritative answer, bypassing the
    /// cache; on failure, falls back to the local table
    pub async fn validate_permission_with_server(&self, user: &User, permission: Permission) -> bool {
        match self.backend.validate_permission(&user.id, permission.as_str()).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(user_id = %user.id, permission = %permission, error = %e, "server validation failed, falling back to local tables");
                evaluator::has_permission(user.role, permission)
            }
        }
    }

    /// Drop every cached decision for a user
    pub fn clear_user_cache(&self, user_id: &str) {
        self.cache.remove_user_entries(user_id);
    }

    /// Drop every cached decision
    pub fn clear_all_cache(&self) {
        self.cache.clear();
    }

    /// Start a periodic refresh for a user
    ///
    /// Refresh failures are swallowed inside the loop so the timer keeps
    /// running. Abort the returned handle to cancel.
    pub fn spawn_auto_refresh(&self, user: &User, interval: Duration) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        let user = user.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                service.refresh_permissions(&user).await;
            }
        })
    }
}
