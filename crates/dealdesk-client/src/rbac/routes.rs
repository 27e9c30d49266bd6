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

//! Route permission rules
//!
//! Each protected route has exactly one rule, matched exact-first then by
//! longest path prefix. Unmatched routes are denied unless listed in
//! [`PUBLIC_ROUTES`]; every public page must be named there explicitly.

use crate::rbac::permissions::Permission;
use crate::rbac::roles::Role;

/// Access requirements for one route subtree
#[derive(Debug)]
pub struct RouteRule {
    /// Route path; also matches any subpath on a `/` boundary
    pub path: &'static str,

    /// Permissions required by this route; empty means none
    pub permissions: &'static [Permission],

    /// Roles allowed on this route; empty means any role
    pub roles: &'static [Role],

    /// Require every listed permission instead of at least one
    pub require_all: bool,
}

/// Routes reachable without any authorization
pub const PUBLIC_ROUTES: &[&str] = &["/", "/login", "/unauthorized"];

/// Protected route table
pub const ROUTE_RULES: &[RouteRule] = &[
    RouteRule {
        path: "/dashboard",
        permissions: &[],
        roles: &[],
        require_all: false,
    },
    RouteRule {
        path: "/deals",
        permissions: &[Permission::ViewOwnDeals],
        roles: &[],
        require_all: false,
    },
    RouteRule {
        path: "/deals/verify",
        permissions: &[Permission::VerifyDealPayment],
        roles: &[Role::SuperAdmin, Role::Verifier],
        require_all: false,
    },
    RouteRule {
        path: "/team",
        permissions: &[Permission::ViewTeamDeals],
        roles: &[Role::SuperAdmin, Role::OrgAdmin, Role::Supervisor],
        require_all: false,
    },
    RouteRule {
        path: "/analytics",
        permissions: &[Permission::ViewAnalytics],
        roles: &[],
        require_all: false,
    },
    RouteRule {
        path: "/reports",
        permissions: &[Permission::ViewAnalytics, Permission::ViewReports],
        roles: &[],
        require_all: true,
    },
    RouteRule {
        path: "/payouts",
        permissions: &[Permission::ManagePayouts],
        roles: &[Role::SuperAdmin, Role::OrgAdmin],
        require_all: false,
    },
    RouteRule {
        path: "/admin",
        permissions: &[Permission::ManageUsers],
        roles: &[Role::SuperAdmin, Role::OrgAdmin],
        require_all: false,
    },
    RouteRule {
        path: "/admin/organizations",
        permissions: &[Permission::ManageOrganizations],
        roles: &[Role::SuperAdmin],
        require_all: false,
    },
];

/// Whether a path is explicitly public
pub fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path)
}

/// Find the rule governing a path: exact match first, then the rule with
/// the longest prefix on a `/` boundary
pub fn find_rule(path: &str) -> Option<&'static RouteRule> {
    if let Some(rule) = ROUTE_RULES.iter().find(|rule| rule.path == path) {
        return Some(rule);
    }

    ROUTE_RULES
        .iter()
        .filter(|rule| {
            path.starts_with(rule.path) && path.as_bytes().get(rule.path.len()) == Some(&b'/')
        })
        .max_by_key(|rule| rule.path.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_wins() {
        let rule = find_rule("/deals/verify").unwrap();
        assert_eq!(rule.path, "/deals/verify");
    }

    #[test]
    fn test_longest_prefix_match() {
        let rule = find_rule("/admin/organizations/42").unwrap();
        assert_eq!(rule.path, "/admin/organizations");

        let rule = find_rule("/admin/users").unwrap();
        assert_eq!(rule.path, "/admin");
    }

    #[test]
    fn test_prefix_requires_segment_boundary() {
        // "/dealsheet" must not match the "/deals" rule
        assert!(find_rule("/dealsheet").is_none());
    }

    #[test]
    fn test_unmatched_route_has_no_rule() {
        assert!(find_rule("/profile").is_none());
    }

    #[test]
    fn test_public_routes() {
        assert!(is_public("/login"));
        assert!(!is_public("/deals"));
    }
}
