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

//! Declarative access gate consumed by the UI layer
//!
//! The gate decides synchronously from locally available data: still-valid
//! cache entries first, the static tables otherwise. When a decision
//! involves permissions it also schedules a best-effort background refresh
//! after the decision is made; that task never participates in the
//! decision's control flow.

use tracing::{debug, warn};

use crate::models::User;
use crate::rbac::evaluator;
use crate::rbac::permissions::Permission;
use crate::rbac::roles::Role;
use crate::rbac::service::{permission_key, route_key, PermissionService};

/// Requirements evaluated by the gate
#[derive(Debug, Clone, Default)]
pub struct AccessRequest {
    /// Permissions the user must hold
    pub required_permissions: Vec<Permission>,

    /// Exact role the user must have
    pub required_role: Option<Role>,

    /// Roles allowed through; empty means any role
    pub allowed_roles: Vec<Role>,

    /// Route the user must be able to access
    pub required_route: Option<String>,

    /// Require every permission in `required_permissions` instead of at
    /// least one
    pub require_all: bool,
}

impl AccessRequest {
    /// Require a set of permissions
    pub fn permissions(permissions: impl Into<Vec<Permission>>) -> Self {
        Self {
            required_permissions: permissions.into(),
            ..Self::default()
        }
    }

    /// Restrict to an allow-list of roles
    pub fn roles(roles: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed_roles: roles.into(),
            ..Self::default()
        }
    }

    /// Require access to a route
    pub fn route(path: impl Into<String>) -> Self {
        Self {
            required_route: Some(path.into()),
            ..Self::default()
        }
    }
}

/// Why the gate denied access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No user, or the auth system has not finished initializing
    NotAuthenticated,
    /// The user's role is not the required one
    RoleMismatch,
    /// The user's role is not in the allow-list
    RoleNotAllowed,
    /// A required permission is missing
    MissingPermission,
    /// The required route is not accessible
    RouteDenied,
}

impl DenyReason {
    /// Default user-facing denial message; callers may substitute their
    /// own
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NotAuthenticated => "You must be signed in to view this content.",
            DenyReason::RoleMismatch | DenyReason::RoleNotAllowed => "Your role does not have access to this content.",
            DenyReason::MissingPermission => "You do not have permission to view this content.",
            DenyReason::RouteDenied => "You do not have access to this page.",
        }
    }
}

/// Outcome of a gate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied(DenyReason),
}

impl AccessDecision {
    /// Whether the protected content should be shown
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }
}

/// Access decision point
#[derive(Clone)]
pub struct AccessGate {
    service: PermissionService,
}

impl AccessGate {
    /// Create a gate over a permission service
    pub fn new(service: PermissionService) -> Self {
        Self { service }
    }

    /// Evaluate an access request
    ///
    /// The decision is synchronous; the cache warm-up it may schedule is
    /// fire-and-forget.
    pub fn evaluate(&self, user: Option<&User>, auth_ready: bool, request: &AccessRequest) -> AccessDecision {
        let decision = self.decide(user, auth_ready, request);

        if !request.required_permissions.is_empty() {
            if let Some(user) = user {
                self.spawn_background_refresh(user);
            }
        }

        if let AccessDecision::Denied(reason) = decision {
            warn!(
                user_id = user.map(|u| u.id.as_str()).unwrap_or("anonymous"),
                reason = ?reason,
                "access denied"
            );
        }

        decision
    }

    /// Imperative form of [`Self::evaluate`] for non-render call sites
    pub fn has_access(&self, user: Option<&User>, auth_ready: bool, request: &AccessRequest) -> bool {
        self.evaluate(user, auth_ready, request).is_granted()
    }

    fn decide(&self, user: Option<&User>, auth_ready: bool, request: &AccessRequest) -> AccessDecision {
        let user = match user {
            Some(user) if auth_ready => user,
            _ => return AccessDecision::Denied(DenyReason::NotAuthenticated),
        };

        if let Some(required) = request.required_role {
            if user.role != required {
                return AccessDecision::Denied(DenyReason::RoleMismatch);
            }
        }

        if !request.allowed_roles.is_empty() && !request.allowed_roles.contains(&user.role) {
            return AccessDecision::Denied(DenyReason::RoleNotAllowed);
        }

        if !request.required_permissions.is_empty() {
            let passed = if request.require_all {
                request.required_permissions.iter().all(|&p| self.permission_allows(user, p))
            } else {
                request.required_permissions.iter().any(|&p| self.permission_allows(user, p))
            };

            if !passed {
                return AccessDecision::Denied(DenyReason::MissingPermission);
            }
        }

        if let Some(path) = &request.required_route {
            if !self.route_allows(user, path) {
                return AccessDecision::Denied(DenyReason::RouteDenied);
            }
        }

        AccessDecision::Granted
    }

    /// Still-valid cache entry first, static tables otherwise
    fn permission_allows(&self, user: &User, permission: Permission) -> bool {
        self.service
            .cache()
            .get(&permission_key(&user.id, permission))
            .unwrap_or_else(|| evaluator::has_permission(user.role, permission))
    }

    fn route_allows(&self, user: &User, path: &str) -> bool {
        self.service
            .cache()
            .get(&route_key(&user.id, path))
            .unwrap_or_else(|| evaluator::can_access_route(user.role, path))
    }

    fn spawn_background_refresh(&self, user: &User) {
        // Outside a runtime (plain sync callers) the warm-up is skipped;
        // the decision above already stands on local data
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime, skipping background permission refresh");
            return;
        };

        let service = self.service.clone();
        let user = user.clone();
        handle.spawn(async move {
            service.refresh_permissions(&user).await;
        });
    }
}
