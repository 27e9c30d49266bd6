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

//! Role definitions and the static role → permission table
//!
//! Roles form a fixed closed set, immutable for the session. The table is
//! configuration data, not behavior: it is consulted through
//! [`role_permissions`] and never mutated at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rbac::permissions::Permission;

/// Dashboard role assigned to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    Supervisor,
    Salesperson,
    Verifier,
    TeamMember,
}

impl Role {
    /// Every role in the system
    pub const ALL: [Role; 6] = [Role::SuperAdmin, Role::OrgAdmin, Role::Supervisor, Role::Salesperson, Role::Verifier, Role::TeamMember];

    /// Wire representation used by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::OrgAdmin => "org-admin",
            Role::Supervisor => "supervisor",
            Role::Salesperson => "salesperson",
            Role::Verifier => "verifier",
            Role::TeamMember => "team-member",
        }
    }

    /// Parse a backend-supplied role tag, fail-closed
    ///
    /// Role tags originate from loosely-typed auth payloads; anything
    /// unknown maps to `None` and must be treated as "no access".
    pub fn parse(value: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|r| r.as_str() == value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permissions granted to a role
///
/// Every role has an entry. Super-admin additionally short-circuits all
/// permission checks in the evaluator; its entry here exists so table
/// lookups stay total.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    use Permission::*;

    match role {
        Role::SuperAdmin => &[
            ManageOrganizations,
            ManageUsers,
            ManageDeals,
            CreateDeal,
            EditDeal,
            ViewOwnDeals,
            ViewTeamDeals,
            ViewAnalytics,
            ViewReports,
            VerifyDealPayment,
            VerifyInvoices,
            ManagePayouts,
        ],
        Role::OrgAdmin => &[ManageUsers, ManageDeals, CreateDeal, EditDeal, ViewOwnDeals, ViewTeamDeals, ViewAnalytics, ViewReports, ManagePayouts],
        Role::Supervisor => &[CreateDeal, EditDeal, ViewOwnDeals, ViewTeamDeals, ViewAnalytics, ViewReports],
        Role::Salesperson => &[CreateDeal, EditDeal, ViewOwnDeals],
        Role::Verifier => &[ViewOwnDeals, VerifyDealPayment, VerifyInvoices],
        Role::TeamMember => &[ViewOwnDeals],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_unknown_role_is_none() {
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::parse("SuperAdmin"), None);
    }

    #[test]
    fn test_every_role_has_table_entry() {
        for role in Role::ALL {
            // Totality matters more than the exact contents here
            let _ = role_permissions(role);
        }
    }

    #[test]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&Role::OrgAdmin).unwrap();
        assert_eq!(json, "\"org-admin\"");

        let parsed: Role = serde_json::from_str("\"team-member\"").unwrap();
        assert_eq!(parsed, Role::TeamMember);
    }
}
