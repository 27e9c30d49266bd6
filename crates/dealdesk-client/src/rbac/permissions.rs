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

//! Permission and scope definitions
//!
//! Both sets are closed: permissions are never combined or derived at
//! runtime, and parsing of backend-supplied strings is fail-closed:
//! anything unknown maps to `None` and is treated as "not granted".

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fine-grained capability a role may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "manage:organizations")]
    ManageOrganizations,

    #[serde(rename = "manage:users")]
    ManageUsers,

    #[serde(rename = "manage:deals")]
    ManageDeals,

    #[serde(rename = "create_deal")]
    CreateDeal,

    #[serde(rename = "edit_deal")]
    EditDeal,

    #[serde(rename = "view_own_deals")]
    ViewOwnDeals,

    #[serde(rename = "view_team_deals")]
    ViewTeamDeals,

    #[serde(rename = "view:analytics")]
    ViewAnalytics,

    #[serde(rename = "view:reports")]
    ViewReports,

    #[serde(rename = "verify_deal_payment")]
    VerifyDealPayment,

    #[serde(rename = "verify:invoices")]
    VerifyInvoices,

    #[serde(rename = "manage:payouts")]
    ManagePayouts,
}

impl Permission {
    /// Every permission in the system
    pub const ALL: [Permission; 12] = [
        Permission::ManageOrganizations,
        Permission::ManageUsers,
        Permission::ManageDeals,
        Permission::CreateDeal,
        Permission::EditDeal,
        Permission::ViewOwnDeals,
        Permission::ViewTeamDeals,
        Permission::ViewAnalytics,
        Permission::ViewReports,
        Permission::VerifyDealPayment,
        Permission::VerifyInvoices,
        Permission::ManagePayouts,
    ];

    /// Wire representation used by the backend and cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageOrganizations => "manage:organizations",
            Permission::ManageUsers => "manage:users",
            Permission::ManageDeals => "manage:deals",
            Permission::CreateDeal => "create_deal",
            Permission::EditDeal => "edit_deal",
            Permission::ViewOwnDeals => "view_own_deals",
            Permission::ViewTeamDeals => "view_team_deals",
            Permission::ViewAnalytics => "view:analytics",
            Permission::ViewReports => "view:reports",
            Permission::VerifyDealPayment => "verify_deal_payment",
            Permission::VerifyInvoices => "verify:invoices",
            Permission::ManagePayouts => "manage:payouts",
        }
    }

    /// Parse a backend-supplied permission string, fail-closed
    pub fn parse(value: &str) -> Option<Permission> {
        Permission::ALL.iter().copied().find(|p| p.as_str() == value)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breadth of data a permission applies to
///
/// Totally ordered: `Own < Team < Organization < All`. A user's granted
/// scope must be at least the resource's scope for access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Own,
    Team,
    Organization,
    All,
}

impl Scope {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Own => "own",
            Scope::Team => "team",
            Scope::Organization => "organization",
            Scope::All => "all",
        }
    }

    /// Parse a scope tag, fail-closed
    pub fn parse(value: &str) -> Option<Scope> {
        match value {
            "own" => Some(Scope::Own),
            "team" => Some(Scope::Team),
            "organization" => Some(Scope::Organization),
            "all" => Some(Scope::All),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_round_trip() {
        for permission in Permission::ALL {
            assert_eq!(Permission::parse(permission.as_str()), Some(permission));
        }
    }

    #[test]
    fn test_unknown_permission_is_none() {
        assert_eq!(Permission::parse("manage:everything"), None);
        assert_eq!(Permission::parse(""), None);
    }

    #[test]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&Permission::ManageUsers).unwrap();
        assert_eq!(json, "\"manage:users\"");

        let parsed: Permission = serde_json::from_str("\"view_own_deals\"").unwrap();
        assert_eq!(parsed, Permission::ViewOwnDeals);
    }

    #[test]
    fn test_scope_ordering() {
        assert!(Scope::Own < Scope::Team);
        assert!(Scope::Team < Scope::Organization);
        assert!(Scope::Organization < Scope::All);
        assert!(Scope::All >= Scope::Own);
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(Scope::parse("team"), Some(Scope::Team));
        assert_eq!(Scope::parse("global"), None);
    }
}
