//! User and role document schemas
//!
//! Permission checks always resolve through the live role document, never a
//! snapshot carried in a token: editing a role takes effect on the next
//! request.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";
/// Collection name for roles
pub const ROLE_COLLECTION: &str = "roles";

/// Zero-padded width of the user-code numeric suffix
pub const USER_CODE_WIDTH: usize = 5;

/// User-code prefix for a role name; unrecognized roles fall back to EMP
pub fn user_code_prefix(role_name: &str) -> &'static str {
    match role_name {
        "Agent" => "AG",
        "Lawyer" => "ADV",
        "Manager" => "MGR",
        "Admin" => "ADM",
        "Buyer" => "BYR",
        "Colony Manager" => "CM",
        _ => "EMP",
    }
}

/// Role document carrying the permission list
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RoleDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    /// Permission strings, or the wildcard "all"
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleDoc {
    pub fn new(name: String, permissions: Vec<String>) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            permissions,
        }
    }
}

impl IntoIndexes for RoleDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .unique(true)
                    .name("role_name_unique".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for RoleDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    pub email: String,

    /// Argon2 password hash; never serialized into API responses
    pub password_hash: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Generated code, prefix derived from role name (e.g. AG-00001)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_code: Option<String>,

    /// Role reference; resolved live on every permission check
    pub role: ObjectId,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ObjectId>,
}

fn default_true() -> bool {
    true
}

impl UserDoc {
    pub fn new(name: String, email: String, password_hash: String, role: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            email,
            password_hash,
            role,
            is_active: true,
            ..Default::default()
        }
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Sparse: user_code is assigned at create but legacy records may
            // lack one
            (
                doc! { "user_code": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name("user_code_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
