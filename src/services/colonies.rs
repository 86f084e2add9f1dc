//! Colony management and the plot-count recount
//!
//! The recount is a full rescan of the colony's live plots, not an
//! increment/decrement scheme. Rescanning makes the operation idempotent:
//! whatever interleaving of plot writes happened, the last recount to run
//! leaves the counts matching the plots collection at that moment.

use bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::db::schemas::{ColonyDoc, ColonyLocation, PartyDetails, PlotCounts, PlotStatus};
use crate::store::Store;
use crate::types::{LedgerError, Result};

/// Fields accepted when creating a colony
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateColonyInput {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub location: Option<ColonyLocation>,
    #[serde(default)]
    pub total_area: Option<f64>,
    #[serde(default)]
    pub price_per_sq_ft: Option<f64>,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub khatoni_holders: Vec<PartyDetails>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Fields accepted when updating a colony. The cached plot counts are absent
/// on purpose: clients never write them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateColonyInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub location: Option<ColonyLocation>,
    #[serde(default)]
    pub total_area: Option<f64>,
    #[serde(default)]
    pub price_per_sq_ft: Option<f64>,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub khatoni_holders: Option<Vec<PartyDetails>>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Clone)]
pub struct ColonyService {
    store: Arc<dyn Store>,
}

impl ColonyService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: CreateColonyInput, actor: ObjectId) -> Result<ColonyDoc> {
        if input.name.trim().is_empty() {
            return Err(LedgerError::BadRequest("Colony name is required".into()));
        }

        let mut colony = ColonyDoc::new(input.name.trim().to_string(), actor);
        colony.address = input.address;
        colony.location = input.location.unwrap_or_default();
        colony.total_area = input.total_area;
        colony.price_per_sq_ft = input.price_per_sq_ft;
        colony.purchase_price = input.purchase_price;
        colony.khatoni_holders = input.khatoni_holders;
        if let Some(status) = input.status {
            colony.status = status;
        }

        let id = self.store.insert_colony(colony).await?;
        self.get(id).await
    }

    pub async fn get(&self, id: ObjectId) -> Result<ColonyDoc> {
        self.store
            .find_colony(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Colony not found".into()))
    }

    pub async fn list(&self) -> Result<Vec<ColonyDoc>> {
        self.store.list_colonies().await
    }

    pub async fn update(&self, id: ObjectId, input: UpdateColonyInput) -> Result<ColonyDoc> {
        let mut colony = self.get(id).await?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(LedgerError::BadRequest("Colony name cannot be empty".into()));
            }
            colony.name = name.trim().to_string();
        }
        if let Some(address) = input.address {
            colony.address = Some(address);
        }
        if let Some(location) = input.location {
            colony.location = location;
        }
        if let Some(total_area) = input.total_area {
            colony.total_area = Some(total_area);
        }
        if let Some(price) = input.price_per_sq_ft {
            colony.price_per_sq_ft = Some(price);
        }
        if let Some(price) = input.purchase_price {
            colony.purchase_price = Some(price);
        }
        if let Some(holders) = input.khatoni_holders {
            colony.khatoni_holders = holders;
        }
        if let Some(status) = input.status {
            colony.status = status;
        }

        self.store.replace_colony(id, colony).await?;
        self.get(id).await
    }

    /// Soft delete. Refused while live plots still reference the colony, so
    /// the plot sequence partition can never be orphaned.
    pub async fn delete(&self, id: ObjectId) -> Result<()> {
        self.get(id).await?;
        let plots = self.store.plots_in_colony(id).await?;
        if !plots.is_empty() {
            return Err(LedgerError::Conflict(format!(
                "Colony still has {} plots",
                plots.len()
            )));
        }
        self.store.soft_delete_colony(id).await?;
        Ok(())
    }

    /// Recount the colony's cached plot counts from a full rescan.
    /// Booked and reserved plots count toward the total only.
    pub async fn recount(&self, id: ObjectId) -> Result<PlotCounts> {
        let plots = self.store.plots_in_colony(id).await?;

        let mut counts = PlotCounts {
            total: plots.len() as i64,
            ..Default::default()
        };
        for plot in &plots {
            match plot.status {
                PlotStatus::Available => counts.available += 1,
                PlotStatus::Sold => counts.sold += 1,
                PlotStatus::Blocked => counts.blocked += 1,
                PlotStatus::Reserved | PlotStatus::Booked => {}
            }
        }

        debug!(
            colony = %id,
            total = counts.total,
            available = counts.available,
            sold = counts.sold,
            blocked = counts.blocked,
            "Recounted colony plots"
        );

        self.store.write_plot_counts(id, counts).await?;
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::PlotDoc;
    use crate::store::MemoryStore;

    fn service() -> ColonyService {
        ColonyService::new(Arc::new(MemoryStore::new()))
    }

    fn plot(colony: ObjectId, number: &str, status: PlotStatus) -> PlotDoc {
        PlotDoc {
            plot_number: number.to_string(),
            colony,
            property_id: ObjectId::new(),
            area: 1000.0,
            price_per_sq_ft: 500.0,
            total_price: 500_000.0,
            status,
            created_by: ObjectId::new(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn recount_is_a_full_rescan() {
        let service = service();
        let actor = ObjectId::new();
        let colony = service
            .create(
                CreateColonyInput {
                    name: "Green Valley".to_string(),
                    ..Default::default()
                },
                actor,
            )
            .await
            .unwrap();
        let colony_id = colony._id.unwrap();

        for (i, status) in [
            PlotStatus::Available,
            PlotStatus::Available,
            PlotStatus::Sold,
            PlotStatus::Blocked,
            PlotStatus::Booked,
            PlotStatus::Reserved,
        ]
        .iter()
        .enumerate()
        {
            service
                .store
                .insert_plot(plot(colony_id, &format!("PLOT-{:04}", i + 1), *status))
                .await
                .unwrap();
        }

        let counts = service.recount(colony_id).await.unwrap();
        assert_eq!(
            counts,
            PlotCounts {
                total: 6,
                available: 2,
                sold: 1,
                blocked: 1,
            }
        );

        // The counts land on the colony document
        let colony = service.get(colony_id).await.unwrap();
        assert_eq!(colony.counts(), counts);

        // Running it again changes nothing
        let again = service.recount(colony_id).await.unwrap();
        assert_eq!(again, counts);
    }

    #[tokio::test]
    async fn delete_refused_while_plots_exist() {
        let service = service();
        let colony = service
            .create(
                CreateColonyInput {
                    name: "Riverside".to_string(),
                    ..Default::default()
                },
                ObjectId::new(),
            )
            .await
            .unwrap();
        let colony_id = colony._id.unwrap();

        service
            .store
            .insert_plot(plot(colony_id, "PLOT-0001", PlotStatus::Available))
            .await
            .unwrap();

        let err = service.delete(colony_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_requires_a_name() {
        let service = service();
        let err = service
            .create(
                CreateColonyInput {
                    name: "   ".to_string(),
                    ..Default::default()
                },
                ObjectId::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }
}
