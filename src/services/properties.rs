//! Properties (phases/sectors) within a colony

use bson::oid::ObjectId;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::schemas::{PropertyDoc, PropertyStatus};
use crate::store::{PlotFilter, Store};
use crate::types::{LedgerError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePropertyInput {
    pub name: String,
    pub colony: ObjectId,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub base_price_per_sq_ft: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default)]
    pub roads: Vec<String>,
    #[serde(default)]
    pub parks: Vec<String>,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePropertyInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub base_price_per_sq_ft: Option<f64>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub facilities: Option<Vec<String>>,
    #[serde(default)]
    pub roads: Option<Vec<String>>,
    #[serde(default)]
    pub parks: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<PropertyStatus>,
}

#[derive(Clone)]
pub struct PropertyService {
    store: Arc<dyn Store>,
}

impl PropertyService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, input: CreatePropertyInput, actor: ObjectId) -> Result<PropertyDoc> {
        if input.name.trim().is_empty() {
            return Err(LedgerError::BadRequest("Property name is required".into()));
        }
        self.store
            .find_colony(input.colony)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Colony not found".into()))?;

        let property = PropertyDoc {
            name: input.name.trim().to_string(),
            colony: input.colony,
            category: input.category,
            address: input.address,
            base_price_per_sq_ft: input.base_price_per_sq_ft,
            images: input.images,
            facilities: input.facilities,
            roads: input.roads,
            parks: input.parks,
            status: input.status.unwrap_or_default(),
            created_by: actor,
            ..Default::default()
        };

        let id = self.store.insert_property(property).await?;
        self.get(id).await
    }

    pub async fn get(&self, id: ObjectId) -> Result<PropertyDoc> {
        self.store
            .find_property(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Property not found".into()))
    }

    pub async fn list(&self, colony: Option<ObjectId>) -> Result<Vec<PropertyDoc>> {
        self.store.list_properties(colony).await
    }

    pub async fn update(&self, id: ObjectId, input: UpdatePropertyInput) -> Result<PropertyDoc> {
        let mut property = self.get(id).await?;

        if let Some(name) = input.name {
            if name.trim().is_empty() {
                return Err(LedgerError::BadRequest(
                    "Property name cannot be empty".into(),
                ));
            }
            property.name = name.trim().to_string();
        }
        if let Some(category) = input.category {
            property.category = Some(category);
        }
        if let Some(address) = input.address {
            property.address = Some(address);
        }
        if let Some(price) = input.base_price_per_sq_ft {
            property.base_price_per_sq_ft = Some(price);
        }
        if let Some(images) = input.images {
            property.images = images;
        }
        if let Some(facilities) = input.facilities {
            property.facilities = facilities;
        }
        if let Some(roads) = input.roads {
            property.roads = roads;
        }
        if let Some(parks) = input.parks {
            property.parks = parks;
        }
        if let Some(status) = input.status {
            property.status = status;
        }

        self.store.replace_property(id, property).await?;
        self.get(id).await
    }

    /// Soft delete, refused while plots still reference the property
    pub async fn delete(&self, id: ObjectId) -> Result<()> {
        self.get(id).await?;
        let filter = PlotFilter {
            property_id: Some(id),
            ..Default::default()
        };
        let page = self.store.list_plots(&filter, 0, 1).await?;
        if page.total > 0 {
            return Err(LedgerError::Conflict(format!(
                "Property still has {} plots",
                page.total
            )));
        }
        self.store.soft_delete_property(id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{ColonyDoc, PlotDoc};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn create_requires_existing_colony() {
        let store = Arc::new(MemoryStore::new());
        let service = PropertyService::new(store.clone());

        let err = service
            .create(
                CreatePropertyInput {
                    name: "Phase 1".to_string(),
                    colony: ObjectId::new(),
                    ..Default::default()
                },
                ObjectId::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_refused_while_plots_reference_it() {
        let store = Arc::new(MemoryStore::new());
        let colony = store
            .insert_colony(ColonyDoc::new("Green Valley".to_string(), ObjectId::new()))
            .await
            .unwrap();
        let service = PropertyService::new(store.clone());

        let property = service
            .create(
                CreatePropertyInput {
                    name: "Phase 1".to_string(),
                    colony,
                    ..Default::default()
                },
                ObjectId::new(),
            )
            .await
            .unwrap();
        let property_id = property._id.unwrap();

        store
            .insert_plot(PlotDoc {
                plot_number: "PLOT-0001".to_string(),
                colony,
                property_id,
                area: 100.0,
                price_per_sq_ft: 10.0,
                total_price: 1000.0,
                created_by: ObjectId::new(),
                ..Default::default()
            })
            .await
            .unwrap();

        let err = service.delete(property_id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }
}
