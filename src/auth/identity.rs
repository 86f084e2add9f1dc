//! Request identity and permission checks
//!
//! An [`Identity`] is resolved per request: token claims give the user id, the
//! user and role documents are fetched fresh, and the role's permission list
//! is what gets checked. The "all" wildcard grants everything, and the Admin
//! role name bypasses the list entirely so an admin locked out by a bad role
//! edit can still repair it.

use bson::oid::ObjectId;

use crate::auth::jwt::Claims;
use crate::db::schemas::RoleDoc;
use crate::store::Store;
use crate::types::{LedgerError, Result};

/// Permission strings checked by the route layer
pub mod perms {
    pub const ALL: &str = "all";

    pub const COLONY_CREATE: &str = "colony_create";
    pub const COLONY_READ: &str = "colony_read";
    pub const COLONY_UPDATE: &str = "colony_update";
    pub const COLONY_DELETE: &str = "colony_delete";

    pub const PROPERTY_CREATE: &str = "property_create";
    pub const PROPERTY_READ: &str = "property_read";
    pub const PROPERTY_UPDATE: &str = "property_update";
    pub const PROPERTY_DELETE: &str = "property_delete";

    pub const PLOT_CREATE: &str = "plot_create";
    pub const PLOT_READ: &str = "plot_read";
    pub const PLOT_UPDATE: &str = "plot_update";
    pub const PLOT_DELETE: &str = "plot_delete";

    pub const BOOKING_CREATE: &str = "booking_create";
    pub const BOOKING_READ: &str = "booking_read";
    pub const BOOKING_UPDATE: &str = "booking_update";
    pub const BOOKING_CANCEL: &str = "booking_cancel";

    pub const USER_CREATE: &str = "user_create";
    pub const USER_READ: &str = "user_read";
    pub const USER_UPDATE: &str = "user_update";

    pub const SETTINGS_READ: &str = "settings_read";
    pub const SETTINGS_UPDATE: &str = "settings_update";
}

/// Role name that bypasses permission-list checks
pub const ADMIN_ROLE: &str = "Admin";

/// The authenticated caller, resolved fresh for each request
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: ObjectId,
    pub email: String,
    pub role_name: String,
    pub permissions: Vec<String>,
}

impl Identity {
    /// Resolve token claims against the live user and role documents
    pub async fn resolve(store: &dyn Store, claims: &Claims) -> Result<Self> {
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| LedgerError::Unauthorized("Invalid token subject".to_string()))?;

        let user = store
            .find_user(user_id)
            .await?
            .ok_or_else(|| LedgerError::Unauthorized("User no longer exists".to_string()))?;

        if !user.is_active {
            return Err(LedgerError::Unauthorized(
                "User account is deactivated".to_string(),
            ));
        }

        let role = store
            .find_role(user.role)
            .await?
            .ok_or_else(|| LedgerError::Unauthorized("User role no longer exists".to_string()))?;

        Ok(Self::from_role(user_id, user.email, &role))
    }

    pub fn from_role(user_id: ObjectId, email: String, role: &RoleDoc) -> Self {
        Self {
            user_id,
            email,
            role_name: role.name.clone(),
            permissions: role.permissions.clone(),
        }
    }

    /// Whether this identity holds a permission (wildcard and Admin included)
    pub fn can(&self, permission: &str) -> bool {
        self.role_name == ADMIN_ROLE
            || self.permissions.iter().any(|p| p == perms::ALL)
            || self.permissions.iter().any(|p| p == permission)
    }

    /// Check a permission, failing with `Forbidden`
    pub fn require(&self, permission: &str) -> Result<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(LedgerError::Forbidden(format!(
                "Missing permission: {}",
                permission
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role_name == ADMIN_ROLE || self.permissions.iter().any(|p| p == perms::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role_name: &str, permissions: &[&str]) -> Identity {
        Identity {
            user_id: ObjectId::new(),
            email: "who@example.com".to_string(),
            role_name: role_name.to_string(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_explicit_permission() {
        let agent = identity("Agent", &[perms::PLOT_READ, perms::BOOKING_CREATE]);
        assert!(agent.can(perms::PLOT_READ));
        assert!(agent.require(perms::BOOKING_CREATE).is_ok());
        assert!(matches!(
            agent.require(perms::PLOT_DELETE),
            Err(LedgerError::Forbidden(_))
        ));
    }

    #[test]
    fn test_wildcard_grants_everything() {
        let manager = identity("Manager", &[perms::ALL]);
        assert!(manager.can(perms::PLOT_DELETE));
        assert!(manager.can(perms::SETTINGS_UPDATE));
        assert!(manager.is_admin());
    }

    #[test]
    fn test_admin_role_bypasses_empty_list() {
        let admin = identity(ADMIN_ROLE, &[]);
        assert!(admin.can(perms::USER_CREATE));
        assert!(admin.is_admin());
    }

    #[tokio::test]
    async fn test_resolve_rejects_deactivated_user() {
        use crate::auth::jwt::Claims;
        use crate::db::schemas::{RoleDoc, UserDoc};
        use crate::store::MemoryStore;

        let store = MemoryStore::new();
        let role_id = store
            .insert_role(RoleDoc::new("Agent".to_string(), vec![]))
            .await
            .unwrap();
        let mut user = UserDoc::new(
            "A".to_string(),
            "a@example.com".to_string(),
            "hash".to_string(),
            role_id,
        );
        user.is_active = false;
        let user_id = store.insert_user(user).await.unwrap();

        let claims = Claims {
            sub: user_id.to_hex(),
            email: "a@example.com".to_string(),
            role: "Agent".to_string(),
            iat: 0,
            exp: u64::MAX,
        };

        let err = Identity::resolve(&store, &claims).await.unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_resolve_picks_up_live_role_edits() {
        use crate::auth::jwt::Claims;
        use crate::db::schemas::{RoleDoc, UserDoc};
        use crate::store::MemoryStore;

        let store = MemoryStore::new();
        let role_id = store
            .insert_role(RoleDoc::new(
                "Agent".to_string(),
                vec![perms::PLOT_READ.to_string()],
            ))
            .await
            .unwrap();
        let user_id = store
            .insert_user(UserDoc::new(
                "A".to_string(),
                "a@example.com".to_string(),
                "hash".to_string(),
                role_id,
            ))
            .await
            .unwrap();

        let claims = Claims {
            sub: user_id.to_hex(),
            email: "a@example.com".to_string(),
            role: "Agent".to_string(),
            iat: 0,
            exp: u64::MAX,
        };

        let identity = Identity::resolve(&store, &claims).await.unwrap();
        assert!(!identity.can(perms::PLOT_DELETE));

        // Grant the permission on the role; the next resolve sees it without
        // a new token
        let mut role = store.find_role(role_id).await.unwrap().unwrap();
        role.permissions.push(perms::PLOT_DELETE.to_string());
        store.replace_role(role_id, role).await.unwrap();

        let identity = Identity::resolve(&store, &claims).await.unwrap();
        assert!(identity.can(perms::PLOT_DELETE));
    }
}
