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

//! Pure access-decision functions
//!
//! Every function here is deterministic, side-effect free, and infallible:
//! a denied check is a normal `false`, never an error. Unknown inputs are
//! kept out by fail-closed parsing at the crate boundary.

use crate::rbac::permissions::{Permission, Scope};
use crate::rbac::roles::{role_permissions, Role};
use crate::rbac::routes;

/// Whether a role holds a permission
///
/// Super-admin is an explicit override: it passes every permission check
/// regardless of the table contents.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    if role == Role::SuperAdmin {
        return true;
    }

    role_permissions(role).contains(&permission)
}

/// Whether a role holds at least one of the given permissions
pub fn has_any_permission(role: Role, permissions: &[Permission]) -> bool {
    permissions.iter().any(|&p| has_permission(role, p))
}

/// Whether a role holds every one of the given permissions
pub fn has_all_permissions(role: Role, permissions: &[Permission]) -> bool {
    permissions.iter().all(|&p| has_permission(role, p))
}

/// Whether a role may access a route path
///
/// A matching rule requires the role to be in the rule's allow-list (when
/// one is given) and the rule's permissions to pass, all-or-any per the
/// rule. Paths without a rule are denied unless explicitly public.
pub fn can_access_route(role: Role, path: &str) -> bool {
    let rule = match routes::find_rule(path) {
        Some(rule) => rule,
        None => return routes::is_public(path),
    };

    if !rule.roles.is_empty() && !rule.roles.contains(&role) {
        return false;
    }

    if rule.permissions.is_empty() {
        return true;
    }

    if rule.require_all {
        has_all_permissions(role, rule.permissions)
    } else {
        has_any_permission(role, rule.permissions)
    }
}

/// Whether a role may act on a resource at a given scope
///
/// Requires the permission itself plus a user scope at least as broad as
/// the resource's placement. An unknown or unset scope on either side
/// denies.
pub fn can_access_resource(role: Role, permission: Permission, user_scope: Option<Scope>, resource_scope: Option<Scope>) -> bool {
    if !has_permission(role, permission) {
        return false;
    }

    match (user_scope, resource_scope) {
        (Some(user), Some(resource)) => user >= resource,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salesperson_permissions() {
        assert!(has_permission(Role::Salesperson, Permission::ViewOwnDeals));
        assert!(!has_permission(Role::Salesperson, Permission::ManageUsers));
    }

    #[test]
    fn test_super_admin_override() {
        for permission in Permission::ALL {
            assert!(has_permission(Role::SuperAdmin, permission));
        }
    }

    #[test]
    fn test_determinism() {
        let first = has_permission(Role::Verifier, Permission::VerifyInvoices);
        let second = has_permission(Role::Verifier, Permission::VerifyInvoices);
        assert_eq!(first, second);
        assert!(first);
    }

    #[test]
    fn test_any_and_all() {
        let set = [Permission::ManageUsers, Permission::ViewOwnDeals];
        assert!(has_any_permission(Role::Salesperson, &set));
        assert!(!has_all_permissions(Role::Salesperson, &set));
        assert!(has_all_permissions(Role::OrgAdmin, &set));
        assert!(!has_any_permission(Role::TeamMember, &[Permission::ManagePayouts]));
    }

    #[test]
    fn test_route_role_allow_list() {
        assert!(can_access_route(Role::Verifier, "/deals/verify"));
        assert!(!can_access_route(Role::Salesperson, "/deals/verify"));
    }

    #[test]
    fn test_route_permission_requirement() {
        assert!(can_access_route(Role::Supervisor, "/analytics"));
        assert!(!can_access_route(Role::Salesperson, "/analytics"));
    }

    #[test]
    fn test_route_require_all() {
        // Supervisor has both analytics and reports
        assert!(can_access_route(Role::Supervisor, "/reports"));
        // Team member has neither
        assert!(!can_access_route(Role::TeamMember, "/reports"));
    }

    #[test]
    fn test_route_prefix_inherits_rule() {
        assert!(can_access_route(Role::OrgAdmin, "/admin/users"));
        assert!(!can_access_route(Role::Supervisor, "/admin/users"));
    }

    #[test]
    fn test_unmatched_route_denied_unless_public() {
        assert!(can_access_route(Role::TeamMember, "/login"));
        assert!(!can_access_route(Role::TeamMember, "/profile"));
        // Even super-admin goes through the public list for unruled paths
        assert!(can_access_route(Role::SuperAdmin, "/"));
    }

    #[test]
    fn test_resource_scope_ordering() {
        assert!(can_access_resource(Role::Supervisor, Permission::ViewTeamDeals, Some(Scope::Team), Some(Scope::Own)));
        assert!(can_access_resource(Role::Supervisor, Permission::ViewTeamDeals, Some(Scope::Team), Some(Scope::Team)));
        assert!(!can_access_resource(Role::Supervisor, Permission::ViewTeamDeals, Some(Scope::Own), Some(Scope::Team)));
    }

    #[test]
    fn test_resource_scope_fail_closed() {
        assert!(!can_access_resource(Role::OrgAdmin, Permission::ManageDeals, None, Some(Scope::Own)));
        assert!(!can_access_resource(Role::OrgAdmin, Permission::ManageDeals, Some(Scope::All), None));
        assert!(!can_access_resource(Role::OrgAdmin, Permission::ManageDeals, None, None));
    }

    #[test]
    fn test_resource_requires_permission() {
        assert!(!can_access_resource(Role::TeamMember, Permission::ManageDeals, Some(Scope::All), Some(Scope::Own)));
    }
}
