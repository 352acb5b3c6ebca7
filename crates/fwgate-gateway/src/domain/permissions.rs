//! Permission and workflow tables.
//!
//! Both tables map a name to the set of roles allowed to use it. A name with
//! no entry denies everyone; the caller decides how that denial surfaces.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::operations::Operation;
use crate::domain::roles::Role;

/// Name to allowed-roles mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleTable(BTreeMap<String, BTreeSet<Role>>);

impl RoleTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Roles allowed for `name`, or `None` when the name is not configured.
    pub fn allowed_roles(&self, name: &str) -> Option<&BTreeSet<Role>> {
        self.0.get(name)
    }

    /// Whether `name` has an entry, even an empty one.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Replace the roles for `name`.
    pub fn insert(&mut self, name: impl Into<String>, roles: impl IntoIterator<Item = Role>) {
        self.0.insert(name.into(), roles.into_iter().collect());
    }

    /// Remove the entry for `name`.
    pub fn remove(&mut self, name: &str) -> Option<BTreeSet<Role>> {
        self.0.remove(name)
    }

    /// Configured names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N, R> FromIterator<(N, R)> for RoleTable
where
    N: Into<String>,
    R: IntoIterator<Item = Role>,
{
    fn from_iter<I: IntoIterator<Item = (N, R)>>(iter: I) -> Self {
        let mut table = RoleTable::new();
        for (name, roles) in iter {
            table.insert(name, roles);
        }
        table
    }
}

const EVERYONE: [Role; 3] = Role::ALL;
const MANAGERS: [Role; 2] = [Role::Admin, Role::TicketManager];
const ADMINS: [Role; 1] = [Role::Admin];

/// Default operation permissions.
pub fn default_permissions() -> RoleTable {
    Operation::ALL
        .into_iter()
        .map(|op| {
            let roles: &[Role] = match op {
                Operation::AccessSecureEndpoint
                | Operation::ListTickets
                | Operation::GetTicket
                | Operation::ListDevices
                | Operation::GetDevice
                | Operation::GetTopologyPathImage
                | Operation::QueryRulesGraphql => &EVERYONE,
                Operation::CreateTicket | Operation::UpdateTicket | Operation::GetTopologyPath => {
                    &MANAGERS
                }
                Operation::TestUpstreamConnection
                | Operation::AddDevices
                | Operation::ImportManagedDevices => &ADMINS,
            };
            (op.id(), roles.iter().copied())
        })
        .collect()
}

/// Default workflow permissions.
pub fn default_workflows() -> RoleTable {
    [
        ("Example Firewall Workflow", EVERYONE.to_vec()),
        ("Example Decom Workflow", MANAGERS.to_vec()),
    ]
    .into_iter()
    .collect()
}
