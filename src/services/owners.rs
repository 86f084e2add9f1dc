//! Owner snapshots and the explicit resync batch
//!
//! Plots carry copies of the settings-registry owner entries, frozen at
//! selection time. Editing the registry never touches existing plots; the
//! resync batch below is the one deliberate way to push current registry
//! data back out to plots that still reference an entry.

use bson::oid::ObjectId;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::db::schemas::{OwnerSnapshot, SettingsDoc};
use crate::store::{PlotFilter, Store};
use crate::types::{LedgerError, Result};

/// Result of a resync batch
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    /// Plots whose snapshots were refreshed
    pub updated: u64,
    /// Plots holding a snapshot whose registry entry no longer exists
    pub orphaned: u64,
}

/// Copy registry entries into plot-embedded snapshots. Unknown ids are an
/// error; selecting an owner that is not in the registry is a client bug.
pub fn snapshot_owners(settings: &SettingsDoc, owner_ids: &[String]) -> Result<Vec<OwnerSnapshot>> {
    owner_ids
        .iter()
        .map(|id| {
            settings
                .find_owner(id)
                .map(|entry| OwnerSnapshot {
                    owner_id: entry.id.clone(),
                    details: entry.details.clone(),
                })
                .ok_or_else(|| {
                    LedgerError::BadRequest(format!("Unknown owner id in selection: {}", id))
                })
        })
        .collect()
}

#[derive(Clone)]
pub struct OwnerSyncService {
    store: Arc<dyn Store>,
}

impl OwnerSyncService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Refresh every plot's owner snapshots from the current registry.
    /// Snapshots whose registry entry was deleted are left untouched and
    /// reported as orphaned; the sale record keeps its historical identity.
    pub async fn sync_plots(&self, actor: ObjectId) -> Result<SyncOutcome> {
        let settings = self
            .store
            .load_settings()
            .await?
            .ok_or_else(|| LedgerError::NotFound("Settings not initialized".into()))?;

        let mut outcome = SyncOutcome {
            updated: 0,
            orphaned: 0,
        };

        // Walk every live plot; pagination keeps memory flat on big ledgers
        let mut skip = 0u64;
        loop {
            let page = self
                .store
                .list_plots(&PlotFilter::default(), skip, 200)
                .await?;
            if page.items.is_empty() {
                break;
            }
            let fetched = page.items.len() as u64;

            for mut plot in page.items {
                if plot.plot_owners.is_empty() {
                    continue;
                }
                let Some(plot_id) = plot._id else { continue };

                let mut changed = false;
                let mut orphaned_here = false;
                for snapshot in &mut plot.plot_owners {
                    match settings.find_owner(&snapshot.owner_id) {
                        Some(entry) => {
                            if snapshot.details != entry.details {
                                snapshot.details = entry.details.clone();
                                changed = true;
                            }
                        }
                        None => orphaned_here = true,
                    }
                }

                if changed {
                    self.store.replace_plot(plot_id, plot).await?;
                    outcome.updated += 1;
                }
                if orphaned_here {
                    outcome.orphaned += 1;
                }
            }

            skip += fetched;
            if skip >= page.total {
                break;
            }
        }

        info!(
            actor = %actor,
            updated = outcome.updated,
            orphaned = outcome.orphaned,
            "Owner snapshot resync finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{PartyDetails, PlotDoc, RegistryParty};
    use crate::store::MemoryStore;

    fn settings_with_owner(name: &str) -> (SettingsDoc, String) {
        let party = RegistryParty::new(PartyDetails {
            name: Some(name.to_string()),
            ..Default::default()
        });
        let id = party.id.clone();
        let settings = SettingsDoc {
            owners: vec![party],
            ..Default::default()
        };
        (settings, id)
    }

    #[test]
    fn snapshot_copies_registry_details() {
        let (settings, id) = settings_with_owner("Ram Kumar");
        let snapshots = snapshot_owners(&settings, &[id.clone()]).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].owner_id, id);
        assert_eq!(snapshots[0].details.name.as_deref(), Some("Ram Kumar"));
    }

    #[test]
    fn snapshot_rejects_unknown_owner() {
        let (settings, _) = settings_with_owner("Ram Kumar");
        let err = snapshot_owners(&settings, &["missing".to_string()]).unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn registry_edit_does_not_touch_plots_until_sync() {
        let store = Arc::new(MemoryStore::new());
        let (mut settings, owner_id) = settings_with_owner("Ram Kumar");

        let snapshots = snapshot_owners(&settings, &[owner_id.clone()]).unwrap();
        let plot_id = store
            .insert_plot(PlotDoc {
                plot_number: "PLOT-0001".to_string(),
                colony: ObjectId::new(),
                property_id: ObjectId::new(),
                area: 100.0,
                price_per_sq_ft: 10.0,
                total_price: 1000.0,
                plot_owners: snapshots,
                created_by: ObjectId::new(),
                ..Default::default()
            })
            .await
            .unwrap();

        // Rename the owner in the registry
        settings.owners[0].details.name = Some("Ram K. Sharma".to_string());
        store.save_settings(settings).await.unwrap();

        // The plot still carries the old snapshot
        let plot = store.find_plot(plot_id).await.unwrap().unwrap();
        assert_eq!(
            plot.plot_owners[0].details.name.as_deref(),
            Some("Ram Kumar")
        );

        // Only the explicit batch refreshes it
        let service = OwnerSyncService::new(store.clone());
        let outcome = service.sync_plots(ObjectId::new()).await.unwrap();
        assert_eq!(outcome.updated, 1);
        assert_eq!(outcome.orphaned, 0);

        let plot = store.find_plot(plot_id).await.unwrap().unwrap();
        assert_eq!(
            plot.plot_owners[0].details.name.as_deref(),
            Some("Ram K. Sharma")
        );
    }

    #[tokio::test]
    async fn sync_reports_orphaned_snapshots() {
        let store = Arc::new(MemoryStore::new());
        let (settings, owner_id) = settings_with_owner("Ram Kumar");
        let snapshots = snapshot_owners(&settings, &[owner_id]).unwrap();

        store
            .insert_plot(PlotDoc {
                plot_number: "PLOT-0001".to_string(),
                colony: ObjectId::new(),
                property_id: ObjectId::new(),
                area: 100.0,
                price_per_sq_ft: 10.0,
                total_price: 1000.0,
                plot_owners: snapshots,
                created_by: ObjectId::new(),
                ..Default::default()
            })
            .await
            .unwrap();

        // Registry entry removed entirely
        store
            .save_settings(SettingsDoc::default())
            .await
            .unwrap();

        let service = OwnerSyncService::new(store.clone());
        let outcome = service.sync_plots(ObjectId::new()).await.unwrap();
        assert_eq!(outcome.updated, 0);
        assert_eq!(outcome.orphaned, 1);
    }
}
