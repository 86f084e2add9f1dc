//! User accounts, roles and login
//!
//! User codes come from the same sequence scheme as plot and booking numbers,
//! partitioned by the role's code prefix. The password hash never leaves this
//! module in an API-facing shape; routes serialize users through
//! [`UserView`].

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::{RoleDoc, UserDoc};
use crate::services::sequence;
use crate::store::Store;
use crate::types::{LedgerError, Result};

const NUMBER_ATTEMPTS: usize = 3;
const MIN_PASSWORD_LEN: usize = 8;

/// Fields accepted when creating a user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: ObjectId,
}

/// Fields accepted when updating a user
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<ObjectId>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
}

/// API-facing user shape; no password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,
    pub role: String,
    pub role_name: Option<String>,
    pub is_active: bool,
}

impl UserView {
    pub fn from_doc(user: &UserDoc, role_name: Option<String>) -> Self {
        Self {
            id: user._id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            user_code: user.user_code.clone(),
            role: user.role.to_hex(),
            role_name,
            is_active: user.is_active,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: CreateUserInput, actor: ObjectId) -> Result<UserDoc> {
        if input.name.trim().is_empty() {
            return Err(LedgerError::BadRequest("Name is required".into()));
        }
        let email = input.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(LedgerError::BadRequest("A valid email is required".into()));
        }
        if input.password.len() < MIN_PASSWORD_LEN {
            return Err(LedgerError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let role = self
            .store
            .find_role(input.role)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Role not found".into()))?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(LedgerError::Conflict(format!(
                "Email {} is already registered",
                email
            )));
        }

        let password_hash = hash_password(&input.password)?;

        let mut user_id = None;
        let mut last_conflict = None;
        for _ in 0..NUMBER_ATTEMPTS {
            let user_code = sequence::next_user_code(self.store.as_ref(), &role.name).await?;
            let mut user = UserDoc::new(
                input.name.trim().to_string(),
                email.clone(),
                password_hash.clone(),
                input.role,
            );
            user.phone = input.phone.clone();
            user.user_code = Some(user_code);
            user.created_by = Some(actor);

            match self.store.insert_user(user).await {
                Ok(id) => {
                    user_id = Some(id);
                    break;
                }
                Err(LedgerError::Conflict(msg)) => last_conflict = Some(msg),
                Err(e) => return Err(e),
            }
        }

        let user_id = user_id.ok_or_else(|| {
            LedgerError::Sequencing(format!(
                "Could not allocate a user code after {} attempts: {}",
                NUMBER_ATTEMPTS,
                last_conflict.unwrap_or_default()
            ))
        })?;

        let user = self.get(user_id).await?;
        info!(user = %user_id, code = ?user.user_code, role = %role.name, "Created user");
        Ok(user)
    }

    pub async fn get(&self, id: ObjectId) -> Result<UserDoc> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("User not found".into()))
    }

    pub async fn list(&self) -> Result<Vec<UserDoc>> {
        self.store.list_users().await
    }

    pub async fn update(&self, id: ObjectId, input: UpdateUserInput) -> Result<UserDoc> {
        let mut user = self.get(id).await?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(LedgerError::BadRequest("Name cannot be empty".into()));
            }
            user.name = name.trim().to_string();
        }
        if let Some(phone) = input.phone {
            user.phone = Some(phone);
        }
        if let Some(role) = input.role {
            self.store
                .find_role(role)
                .await?
                .ok_or_else(|| LedgerError::NotFound("Role not found".into()))?;
            // The code keeps its original prefix; it is an identifier, not a
            // live role display
            user.role = role;
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }
        if let Some(password) = input.password {
            if password.len() < MIN_PASSWORD_LEN {
                return Err(LedgerError::BadRequest(format!(
                    "Password must be at least {} characters",
                    MIN_PASSWORD_LEN
                )));
            }
            user.password_hash = hash_password(&password)?;
        }

        self.store.replace_user(id, user).await?;
        self.get(id).await
    }

    /// Check credentials, returning the user and its role on success. The
    /// error is the same whether the email or the password was wrong.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<(UserDoc, RoleDoc)> {
        let email = email.trim().to_lowercase();
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| LedgerError::Unauthorized("Invalid email or password".into()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(LedgerError::Unauthorized("Invalid email or password".into()));
        }
        if !user.is_active {
            return Err(LedgerError::Unauthorized(
                "User account is deactivated".into(),
            ));
        }

        let role = self
            .store
            .find_role(user.role)
            .await?
            .ok_or_else(|| LedgerError::Unauthorized("User role no longer exists".into()))?;

        Ok((user, role))
    }

    pub async fn view(&self, user: &UserDoc) -> Result<UserView> {
        let role_name = self
            .store
            .find_role(user.role)
            .await?
            .map(|role| role.name);
        Ok(UserView::from_doc(user, role_name))
    }

    /// Seed an Admin role and account when none exist. Dev-mode convenience
    /// so a fresh in-memory instance is immediately usable.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<Option<UserDoc>> {
        if self.store.find_user_by_email(email).await?.is_some() {
            return Ok(None);
        }

        let role_id = match self.store.find_role_by_name("Admin").await? {
            Some(role) => role
                ._id
                .ok_or_else(|| LedgerError::Internal("Role has no id".into()))?,
            None => {
                self.store
                    .insert_role(RoleDoc::new("Admin".to_string(), vec!["all".to_string()]))
                    .await?
            }
        };

        let user = self
            .create(
                CreateUserInput {
                    name: "Administrator".to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                    phone: None,
                    role: role_id,
                },
                ObjectId::new(),
            )
            .await?;
        info!(email = %email, "Bootstrapped admin account");
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn service_with_roles() -> (UserService, ObjectId, ObjectId) {
        let store = Arc::new(MemoryStore::new());
        let agent_role = store
            .insert_role(RoleDoc::new("Agent".to_string(), vec![]))
            .await
            .unwrap();
        let lawyer_role = store
            .insert_role(RoleDoc::new("Lawyer".to_string(), vec![]))
            .await
            .unwrap();
        (UserService::new(store), agent_role, lawyer_role)
    }

    fn input(email: &str, role: ObjectId) -> CreateUserInput {
        CreateUserInput {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "a-long-password".to_string(),
            phone: None,
            role,
        }
    }

    #[tokio::test]
    async fn user_codes_follow_the_role_prefix() {
        let (service, agent_role, lawyer_role) = service_with_roles().await;
        let actor = ObjectId::new();

        let a1 = service
            .create(input("a1@example.com", agent_role), actor)
            .await
            .unwrap();
        let a2 = service
            .create(input("a2@example.com", agent_role), actor)
            .await
            .unwrap();
        let l1 = service
            .create(input("l1@example.com", lawyer_role), actor)
            .await
            .unwrap();

        assert_eq!(a1.user_code.as_deref(), Some("AG-00001"));
        assert_eq!(a2.user_code.as_deref(), Some("AG-00002"));
        // Lawyer sequence is independent of the agent one
        assert_eq!(l1.user_code.as_deref(), Some("ADV-00001"));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let (service, agent_role, _) = service_with_roles().await;
        let actor = ObjectId::new();

        service
            .create(input("dup@example.com", agent_role), actor)
            .await
            .unwrap();
        let err = service
            .create(input("dup@example.com", agent_role), actor)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn authenticate_round_trip() {
        let (service, agent_role, _) = service_with_roles().await;
        service
            .create(input("login@example.com", agent_role), ObjectId::new())
            .await
            .unwrap();

        let (user, role) = service
            .authenticate("login@example.com", "a-long-password")
            .await
            .unwrap();
        assert_eq!(user.email, "login@example.com");
        assert_eq!(role.name, "Agent");

        // Wrong password and unknown email give the same error kind
        assert!(matches!(
            service
                .authenticate("login@example.com", "wrong")
                .await
                .unwrap_err(),
            LedgerError::Unauthorized(_)
        ));
        assert!(matches!(
            service
                .authenticate("nobody@example.com", "a-long-password")
                .await
                .unwrap_err(),
            LedgerError::Unauthorized(_)
        ));
    }

    #[tokio::test]
    async fn deactivated_user_cannot_log_in() {
        let (service, agent_role, _) = service_with_roles().await;
        let user = service
            .create(input("inactive@example.com", agent_role), ObjectId::new())
            .await
            .unwrap();

        service
            .update(
                user._id.unwrap(),
                UpdateUserInput {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = service
            .authenticate("inactive@example.com", "a-long-password")
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn weak_passwords_are_rejected() {
        let (service, agent_role, _) = service_with_roles().await;
        let mut bad = input("weak@example.com", agent_role);
        bad.password = "short".to_string();
        let err = service.create(bad, ObjectId::new()).await.unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn bootstrap_admin_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let service = UserService::new(store.clone());

        let first = service
            .bootstrap_admin("admin@example.com", "admin-password")
            .await
            .unwrap();
        assert!(first.is_some());

        let second = service
            .bootstrap_admin("admin@example.com", "admin-password")
            .await
            .unwrap();
        assert!(second.is_none());

        let (user, role) = service
            .authenticate("admin@example.com", "admin-password")
            .await
            .unwrap();
        assert_eq!(role.name, "Admin");
        assert_eq!(user.user_code.as_deref(), Some("ADM-00001"));
    }
}
