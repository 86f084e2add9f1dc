//! Settings document schema
//!
//! A singleton document holding company information and the mutable registry
//! of legal-document holders (owners) and company witnesses. Plots copy owner
//! data out of this registry at selection time; the registry is never resolved
//! live from a plot.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{
    documents::{DocumentSet, PartyDetails},
    Metadata,
};

/// Collection name for settings (holds a single document)
pub const SETTINGS_COLLECTION: &str = "settings";

/// A registry entry for an owner or company witness
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RegistryParty {
    /// Stable id referenced by plot snapshots
    pub id: String,
    #[serde(flatten)]
    pub details: PartyDetails,
}

impl RegistryParty {
    pub fn new(details: PartyDetails) -> Self {
        Self {
            id: ObjectId::new().to_hex(),
            details,
        }
    }
}

/// Settings document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SettingsDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default = "default_company_name")]
    pub company_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_number: Option<String>,

    /// Registry of land sellers
    #[serde(default)]
    pub owners: Vec<RegistryParty>,

    /// Registry of company witnesses
    #[serde(default)]
    pub company_witnesses: Vec<RegistryParty>,

    // Legacy single-owner fields, consumed by the one-time startup migration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_owner_aadhar_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_owner_pan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_owner_documents: Option<DocumentSet>,
}

fn default_company_name() -> String {
    "Plotledger".to_string()
}

impl Default for SettingsDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            company_name: default_company_name(),
            email: None,
            phone: None,
            address: None,
            gst_number: None,
            pan_number: None,
            owners: Vec::new(),
            company_witnesses: Vec::new(),
            legacy_owner_aadhar_number: None,
            legacy_owner_pan_number: None,
            legacy_owner_documents: None,
        }
    }
}

impl SettingsDoc {
    pub fn find_owner(&self, id: &str) -> Option<&RegistryParty> {
        self.owners.iter().find(|o| o.id == id)
    }

    /// Whether legacy single-owner fields still need migrating
    pub fn needs_owner_migration(&self) -> bool {
        self.owners.is_empty()
            && (self.legacy_owner_aadhar_number.is_some()
                || self.legacy_owner_pan_number.is_some()
                || self.legacy_owner_documents.is_some())
    }
}

impl IntoIndexes for SettingsDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![]
    }
}

impl MutMetadata for SettingsDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
