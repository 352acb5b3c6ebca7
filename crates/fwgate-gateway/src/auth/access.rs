//! Permission enforcement.
//!
//! [`AccessControl`] combines authentication with the operation and workflow
//! tables. Handlers call it before touching upstream.

use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::authenticator::{Authenticator, Identity};
use crate::auth::store::CredentialStore;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::operations::Operation;
use crate::domain::permissions::RoleTable;

/// Authentication plus per-operation and per-workflow permission checks.
#[derive(Clone)]
pub struct AccessControl {
    authenticator: Authenticator,
    permissions: Arc<RoleTable>,
    workflows: Arc<RoleTable>,
}

impl AccessControl {
    pub fn new(store: Arc<dyn CredentialStore>, permissions: RoleTable, workflows: RoleTable) -> Self {
        Self {
            authenticator: Authenticator::new(store),
            permissions: Arc::new(permissions),
            workflows: Arc::new(workflows),
        }
    }

    /// Authenticate the caller and authorize `operation`.
    pub fn check(&self, headers: &HeaderMap, operation: Operation) -> GatewayResult<Identity> {
        let identity = self.authenticator.authenticate(headers)?;
        self.authorize(identity, operation.id())
    }

    /// Admit `identity` for `permission_id`.
    ///
    /// An identifier without a table entry is a configuration error and
    /// denies everyone.
    pub fn authorize(&self, identity: Identity, permission_id: &str) -> GatewayResult<Identity> {
        let Some(allowed) = self.permissions.allowed_roles(permission_id) else {
            error!(permission = permission_id, "Permission identifier not configured");
            return Err(GatewayError::ConfigurationError(
                "Permission configuration error".into(),
            ));
        };

        if !allowed.contains(&identity.role) {
            warn!(
                permission = permission_id,
                key_prefix = %identity.api_key.prefix(),
                role = %identity.role,
                "Permission denied"
            );
            return Err(GatewayError::forbidden(permission_id));
        }

        info!(
            permission = permission_id,
            key_prefix = %identity.api_key.prefix(),
            role = %identity.role,
            "Permission check passed"
        );
        Ok(identity)
    }

    /// Admit `identity` to open tickets under `workflow`.
    ///
    /// An unconfigured workflow is rejected for every role before the role
    /// is looked at.
    pub fn authorize_workflow(&self, identity: &Identity, workflow: &str) -> GatewayResult<()> {
        let Some(allowed) = self.workflows.allowed_roles(workflow) else {
            warn!(workflow, "Ticket creation for unconfigured workflow");
            return Err(GatewayError::bad_request(format!(
                "Workflow '{workflow}' is not configured for ticket creation"
            )));
        };

        if !allowed.contains(&identity.role) {
            warn!(
                workflow,
                key_prefix = %identity.api_key.prefix(),
                role = %identity.role,
                "Workflow permission denied"
            );
            return Err(GatewayError::Forbidden(format!(
                "Role '{}' may not create tickets for workflow '{workflow}'",
                identity.role
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authenticator::ApiKey;
    use crate::auth::store::InMemoryCredentialStore;
    use crate::domain::permissions::{default_permissions, default_workflows};
    use crate::domain::roles::Role;

    fn access(permissions: RoleTable) -> AccessControl {
        let store = InMemoryCredentialStore::new();
        store.add_key("admin_key", Role::Admin);
        store.add_key("user_key", Role::User);
        AccessControl::new(Arc::new(store), permissions, default_workflows())
    }

    fn identity(role: Role) -> Identity {
        Identity {
            api_key: ApiKey::new("some_key_value"),
            role,
        }
    }

    #[test]
    fn test_authorize_matches_table_for_every_role() {
        let table = default_permissions();
        let access = access(table.clone());

        for op in Operation::ALL {
            let allowed = table.allowed_roles(op.id()).unwrap();
            for role in Role::ALL {
                let result = access.authorize(identity(role), op.id());
                assert_eq!(
                    result.is_ok(),
                    allowed.contains(&role),
                    "{role} on {op}"
                );
                if let Err(e) = result {
                    assert!(matches!(e, GatewayError::Forbidden(ref m) if m.contains(op.id())));
                }
            }
        }
    }

    #[test]
    fn test_authorize_returns_identity_unchanged() {
        let access = access(default_permissions());
        let who = identity(Role::TicketManager);
        assert_eq!(access.authorize(who.clone(), "create_ticket"), Ok(who));
    }

    #[test]
    fn test_unconfigured_permission_fails_closed() {
        let mut table = default_permissions();
        table.remove("list_devices");
        let access = access(table);
        for role in Role::ALL {
            assert!(matches!(
                access.authorize(identity(role), "list_devices"),
                Err(GatewayError::ConfigurationError(_))
            ));
        }
    }

    #[test]
    fn test_empty_role_set_denies_everyone() {
        let mut table = default_permissions();
        table.insert("get_device", Vec::<Role>::new());
        let access = access(table);
        assert!(matches!(
            access.authorize(identity(Role::Admin), "get_device"),
            Err(GatewayError::Forbidden(_))
        ));
    }

    #[test]
    fn test_unconfigured_workflow_bad_request_for_every_role() {
        let access = access(default_permissions());
        for role in Role::ALL {
            assert!(matches!(
                access.authorize_workflow(&identity(role), "NotConfigured"),
                Err(GatewayError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn test_workflow_role_check() {
        let access = access(default_permissions());
        assert!(access
            .authorize_workflow(&identity(Role::User), "Example Firewall Workflow")
            .is_ok());
        assert!(matches!(
            access.authorize_workflow(&identity(Role::User), "Example Decom Workflow"),
            Err(GatewayError::Forbidden(_))
        ));
        assert!(access
            .authorize_workflow(&identity(Role::Admin), "Example Decom Workflow")
            .is_ok());
    }

    #[test]
    fn test_check_authenticates_then_authorizes() {
        let access = access(default_permissions());
        let mut headers = HeaderMap::new();
        assert!(matches!(
            access.check(&headers, Operation::AddDevices),
            Err(GatewayError::Unauthenticated(_))
        ));

        headers.insert("x-api-key", "user_key".parse().unwrap());
        assert!(matches!(
            access.check(&headers, Operation::AddDevices),
            Err(GatewayError::Forbidden(_))
        ));
        assert_eq!(
            access.check(&headers, Operation::ListDevices).unwrap().role,
            Role::User
        );
    }
}
