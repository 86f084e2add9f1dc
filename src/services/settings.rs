//! Company settings and the owners registry
//!
//! Settings are a singleton document. Registry entries (owners and company
//! witnesses) keep their ids across edits so plot snapshots can point back at
//! them; entries submitted without an id are new and get one assigned.

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{DocumentSet, PartyDetails, RegistryParty, SettingsDoc};
use crate::store::Store;
use crate::types::{LedgerError, Result};

/// A registry entry as submitted by a client. No id means a new entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryEntryInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub details: PartyDetails,
}

/// Fields accepted when updating settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsInput {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gst_number: Option<String>,
    #[serde(default)]
    pub pan_number: Option<String>,
    /// Full replacement of the owners registry (ids preserved where given)
    #[serde(default)]
    pub owners: Option<Vec<RegistryEntryInput>>,
    #[serde(default)]
    pub company_witnesses: Option<Vec<RegistryEntryInput>>,
}

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn Store>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Load the settings document, creating the default one on first access
    pub async fn get_or_init(&self) -> Result<SettingsDoc> {
        if let Some(settings) = self.store.load_settings().await? {
            return Ok(settings);
        }
        self.store.save_settings(SettingsDoc::default()).await?;
        self.store
            .load_settings()
            .await?
            .ok_or_else(|| LedgerError::Internal("Settings vanished after init".into()))
    }

    pub async fn update(&self, input: UpdateSettingsInput) -> Result<SettingsDoc> {
        let mut settings = self.get_or_init().await?;

        if let Some(company_name) = input.company_name {
            if company_name.trim().is_empty() {
                return Err(LedgerError::BadRequest(
                    "Company name cannot be empty".into(),
                ));
            }
            settings.company_name = company_name.trim().to_string();
        }
        if let Some(email) = input.email {
            settings.email = Some(email);
        }
        if let Some(phone) = input.phone {
            settings.phone = Some(phone);
        }
        if let Some(address) = input.address {
            settings.address = Some(address);
        }
        if let Some(gst_number) = input.gst_number {
            settings.gst_number = Some(gst_number);
        }
        if let Some(pan_number) = input.pan_number {
            settings.pan_number = Some(pan_number);
        }
        if let Some(owners) = input.owners {
            settings.owners = apply_registry_entries(&settings.owners, owners)?;
        }
        if let Some(witnesses) = input.company_witnesses {
            settings.company_witnesses =
                apply_registry_entries(&settings.company_witnesses, witnesses)?;
        }

        self.store.save_settings(settings).await?;
        self.get_or_init().await
    }

    /// One-time startup migration of the legacy single-owner fields into the
    /// owners registry. Returns whether a migration ran.
    pub async fn migrate_legacy_owner(&self) -> Result<bool> {
        let Some(mut settings) = self.store.load_settings().await? else {
            return Ok(false);
        };
        if !settings.needs_owner_migration() {
            return Ok(false);
        }

        let details = PartyDetails {
            name: Some(settings.company_name.clone()),
            aadhar_number: settings.legacy_owner_aadhar_number.take(),
            pan_number: settings.legacy_owner_pan_number.take(),
            documents: settings
                .legacy_owner_documents
                .take()
                .unwrap_or_else(DocumentSet::default),
            ..Default::default()
        };
        let entry = RegistryParty::new(details);
        info!(owner = %entry.id, "Migrated legacy owner fields into the registry");
        settings.owners.push(entry);

        self.store.save_settings(settings).await?;
        Ok(true)
    }
}

/// Merge submitted registry entries against the current list. Entries with an
/// id must already exist (a typo must not silently mint a new identity);
/// entries without one are new.
fn apply_registry_entries(
    current: &[RegistryParty],
    submitted: Vec<RegistryEntryInput>,
) -> Result<Vec<RegistryParty>> {
    submitted
        .into_iter()
        .map(|entry| match entry.id {
            Some(id) => {
                if !current.iter().any(|e| e.id == id) {
                    return Err(LedgerError::BadRequest(format!(
                        "Unknown registry entry id: {}",
                        id
                    )));
                }
                Ok(RegistryParty {
                    id,
                    details: entry.details,
                })
            }
            None => Ok(RegistryParty::new(entry.details)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> SettingsService {
        SettingsService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn get_or_init_creates_the_singleton() {
        let service = service();
        let settings = service.get_or_init().await.unwrap();
        assert_eq!(settings.company_name, "Plotledger");
        assert!(settings._id.is_some());

        // A second call returns the same document
        let again = service.get_or_init().await.unwrap();
        assert_eq!(again._id, settings._id);
    }

    #[tokio::test]
    async fn registry_entries_keep_their_ids_across_edits() {
        let service = service();
        service.get_or_init().await.unwrap();

        let settings = service
            .update(UpdateSettingsInput {
                owners: Some(vec![RegistryEntryInput {
                    id: None,
                    details: PartyDetails {
                        name: Some("Ram Kumar".to_string()),
                        ..Default::default()
                    },
                }]),
                ..Default::default()
            })
            .await
            .unwrap();
        let owner_id = settings.owners[0].id.clone();

        // Edit the same entry: id survives
        let settings = service
            .update(UpdateSettingsInput {
                owners: Some(vec![RegistryEntryInput {
                    id: Some(owner_id.clone()),
                    details: PartyDetails {
                        name: Some("Ram K. Sharma".to_string()),
                        ..Default::default()
                    },
                }]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(settings.owners.len(), 1);
        assert_eq!(settings.owners[0].id, owner_id);
        assert_eq!(
            settings.owners[0].details.name.as_deref(),
            Some("Ram K. Sharma")
        );
    }

    #[tokio::test]
    async fn unknown_entry_id_is_rejected() {
        let service = service();
        service.get_or_init().await.unwrap();

        let err = service
            .update(UpdateSettingsInput {
                owners: Some(vec![RegistryEntryInput {
                    id: Some("not-a-real-id".to_string()),
                    details: PartyDetails::default(),
                }]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn legacy_owner_fields_migrate_once() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_settings(SettingsDoc {
                company_name: "Old Estates".to_string(),
                legacy_owner_aadhar_number: Some("1234-5678-9012".to_string()),
                legacy_owner_pan_number: Some("ABCDE1234F".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let service = SettingsService::new(store.clone());
        assert!(service.migrate_legacy_owner().await.unwrap());

        let settings = store.load_settings().await.unwrap().unwrap();
        assert_eq!(settings.owners.len(), 1);
        assert_eq!(settings.owners[0].details.name.as_deref(), Some("Old Estates"));
        assert_eq!(
            settings.owners[0].details.aadhar_number.as_deref(),
            Some("1234-5678-9012")
        );
        assert!(settings.legacy_owner_aadhar_number.is_none());
        assert!(settings.legacy_owner_pan_number.is_none());

        // Second run is a no-op
        assert!(!service.migrate_legacy_owner().await.unwrap());
    }

    #[tokio::test]
    async fn migration_skips_when_owners_already_exist() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_settings(SettingsDoc {
                owners: vec![RegistryParty::new(PartyDetails::default())],
                legacy_owner_pan_number: Some("ABCDE1234F".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let service = SettingsService::new(store);
        assert!(!service.migrate_legacy_owner().await.unwrap());
    }
}
