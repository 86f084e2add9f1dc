//! Plot lifecycle
//!
//! Creation assigns the next number in the colony's sequence unless the
//! caller supplies one explicitly, pricing is always recomputed from area and
//! rate, and every status write that lands in
//! booked or sold is reconciled against the booking ledger. The number
//! assignment races under concurrency; the unique (colony, plot_number) index
//! is the arbiter and the loser retries with a fresh number.

use bson::{oid::ObjectId, DateTime};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::Identity;
use crate::db::schemas::{
    Metadata, PartyDetails, PlotCustomer, PlotDimensions, PlotDoc, PlotStatus,
};
use crate::services::bookings::BookingService;
use crate::services::colonies::ColonyService;
use crate::services::owners::snapshot_owners;
use crate::services::sequence;
use crate::store::{Page, PlotFilter, Store};
use crate::types::{LedgerError, Result};

/// Attempts at claiming a plot number before giving up
const NUMBER_ATTEMPTS: usize = 3;

/// Fields accepted when creating a plot. Bulk entry of an already-sold ledger
/// is supported by passing a status and customer up front.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePlotInput {
    pub colony: ObjectId,
    pub property_id: ObjectId,
    /// Explicit number override; generated from the colony sequence when
    /// absent. A duplicate within the colony is a conflict, not a retry.
    #[serde(default)]
    pub plot_number: Option<String>,
    pub area: f64,
    pub price_per_sq_ft: f64,
    #[serde(default)]
    pub plot_type: Option<String>,
    #[serde(default)]
    pub dimensions: Option<PlotDimensions>,
    #[serde(default)]
    pub status: Option<PlotStatus>,
    #[serde(default)]
    pub customer: Option<PlotCustomer>,
    #[serde(default)]
    pub final_price: Option<f64>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub registry_status: Option<String>,
    #[serde(default)]
    pub registry_document: Vec<String>,
    #[serde(default)]
    pub plot_images: Vec<String>,
    /// Ids of settings-registry owners to snapshot onto the plot
    #[serde(default)]
    pub owner_ids: Vec<String>,
    #[serde(default)]
    pub witnesses: Vec<PartyDetails>,
    #[serde(default)]
    pub facing: Option<String>,
    #[serde(default)]
    pub corner: bool,
    #[serde(default)]
    pub more_information: Option<String>,
}

/// Fields accepted when updating a plot. `registry_document` and
/// `plot_images` merge additively; everything else overwrites.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlotInput {
    #[serde(default)]
    pub colony: Option<ObjectId>,
    #[serde(default)]
    pub property_id: Option<ObjectId>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub price_per_sq_ft: Option<f64>,
    #[serde(default)]
    pub plot_type: Option<String>,
    #[serde(default)]
    pub dimensions: Option<PlotDimensions>,
    #[serde(default)]
    pub status: Option<PlotStatus>,
    #[serde(default)]
    pub customer: Option<PlotCustomer>,
    #[serde(default)]
    pub registry_date: Option<String>,
    #[serde(default)]
    pub final_price: Option<f64>,
    #[serde(default)]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub registry_status: Option<String>,
    #[serde(default)]
    pub registry_document: Vec<String>,
    #[serde(default)]
    pub plot_images: Vec<String>,
    #[serde(default)]
    pub payment_slip: Option<String>,
    #[serde(default)]
    pub owner_ids: Option<Vec<String>>,
    #[serde(default)]
    pub witnesses: Option<Vec<PartyDetails>>,
    #[serde(default)]
    pub facing: Option<String>,
    #[serde(default)]
    pub corner: Option<bool>,
    #[serde(default)]
    pub more_information: Option<String>,
}

#[derive(Clone)]
pub struct PlotService {
    store: Arc<dyn Store>,
    colonies: ColonyService,
    bookings: BookingService,
}

impl PlotService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let colonies = ColonyService::new(store.clone());
        let bookings = BookingService::new(store.clone());
        Self {
            store,
            colonies,
            bookings,
        }
    }

    pub async fn get(&self, id: ObjectId) -> Result<PlotDoc> {
        self.store
            .find_plot(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Plot not found".into()))
    }

    pub async fn list(&self, filter: &PlotFilter, skip: u64, limit: i64) -> Result<Page<PlotDoc>> {
        self.store.list_plots(filter, skip, limit).await
    }

    pub async fn create(&self, input: CreatePlotInput, identity: &Identity) -> Result<PlotDoc> {
        if input.area <= 0.0 {
            return Err(LedgerError::BadRequest("Plot area must be positive".into()));
        }
        if input.price_per_sq_ft <= 0.0 {
            return Err(LedgerError::BadRequest(
                "Price per sq ft must be positive".into(),
            ));
        }

        self.colonies.get(input.colony).await?;
        let property = self
            .store
            .find_property(input.property_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Property not found".into()))?;
        if property.colony != input.colony {
            return Err(LedgerError::BadRequest(
                "Property does not belong to the given colony".into(),
            ));
        }

        let status = input.status.unwrap_or_default();
        if status == PlotStatus::Reserved && !identity.is_admin() {
            return Err(LedgerError::Forbidden(
                "Only an admin can reserve a plot".into(),
            ));
        }

        let plot_owners = if input.owner_ids.is_empty() {
            Vec::new()
        } else {
            let settings = self
                .store
                .load_settings()
                .await?
                .ok_or_else(|| LedgerError::BadRequest("Owners registry is empty".into()))?;
            snapshot_owners(&settings, &input.owner_ids)?
        };

        let manual_number = match input.plot_number.as_deref().map(str::trim) {
            Some("") => {
                return Err(LedgerError::BadRequest("plot_number cannot be blank".into()))
            }
            Some(number) => Some(number.to_string()),
            None => None,
        };

        let total_price = input.area * input.price_per_sq_ft;

        let mut plot_id = None;
        let mut last_conflict = None;
        let attempts = if manual_number.is_some() {
            1
        } else {
            NUMBER_ATTEMPTS
        };
        for _ in 0..attempts {
            let number = match &manual_number {
                Some(number) => number.clone(),
                None => sequence::next_plot_number(self.store.as_ref(), input.colony).await?,
            };
            let plot = PlotDoc {
                _id: None,
                metadata: Metadata::new(),
                plot_number: number,
                plot_type: input
                    .plot_type
                    .clone()
                    .unwrap_or_else(|| "residential".to_string()),
                colony: input.colony,
                property_id: input.property_id,
                area: input.area,
                dimensions: input.dimensions.clone().unwrap_or_default(),
                price_per_sq_ft: input.price_per_sq_ft,
                total_price,
                status,
                customer: input.customer.clone().unwrap_or_default(),
                registry_date: None,
                final_price: input.final_price,
                paid_amount: input.paid_amount,
                registry_status: input
                    .registry_status
                    .clone()
                    .unwrap_or_else(|| "pending".to_string()),
                registry_document: input.registry_document.clone(),
                plot_images: input.plot_images.clone(),
                payment_slip: None,
                plot_owners: plot_owners.clone(),
                witnesses: input.witnesses.clone(),
                facing: input.facing.clone(),
                corner: input.corner,
                more_information: input.more_information.clone(),
                sold_date: (status == PlotStatus::Sold).then(DateTime::now),
                created_by: identity.user_id,
            };

            match self.store.insert_plot(plot).await {
                Ok(id) => {
                    plot_id = Some(id);
                    break;
                }
                Err(LedgerError::Conflict(msg)) => {
                    // A manual number that clashes is the caller's error
                    if manual_number.is_some() {
                        return Err(LedgerError::Conflict(msg));
                    }
                    // Lost the number race; pick up the new highest and go again
                    last_conflict = Some(msg);
                }
                Err(e) => return Err(e),
            }
        }

        let plot_id = plot_id.ok_or_else(|| {
            LedgerError::Sequencing(format!(
                "Could not allocate a plot number after {} attempts: {}",
                NUMBER_ATTEMPTS,
                last_conflict.unwrap_or_default()
            ))
        })?;

        let plot = self.get(plot_id).await?;
        info!(plot = %plot_id, number = %plot.plot_number, status = %plot.status, "Created plot");

        if plot.status.triggers_booking() {
            self.bookings.ensure_booking(&plot, identity.user_id).await?;
        }
        self.colonies.recount(plot.colony).await?;

        self.get(plot_id).await
    }

    pub async fn update(
        &self,
        id: ObjectId,
        input: UpdatePlotInput,
        identity: &Identity,
    ) -> Result<PlotDoc> {
        let mut plot = self.get(id).await?;
        let old_colony = plot.colony;
        let old_status = plot.status;

        if let Some(colony) = input.colony {
            if colony != plot.colony {
                self.colonies.get(colony).await?;
                plot.colony = colony;
            }
        }
        if let Some(property_id) = input.property_id {
            let property = self
                .store
                .find_property(property_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound("Property not found".into()))?;
            if property.colony != plot.colony {
                return Err(LedgerError::BadRequest(
                    "Property does not belong to the plot's colony".into(),
                ));
            }
            plot.property_id = property_id;
        }

        if let Some(area) = input.area {
            if area <= 0.0 {
                return Err(LedgerError::BadRequest("Plot area must be positive".into()));
            }
            plot.area = area;
        }
        if let Some(price) = input.price_per_sq_ft {
            if price <= 0.0 {
                return Err(LedgerError::BadRequest(
                    "Price per sq ft must be positive".into(),
                ));
            }
            plot.price_per_sq_ft = price;
        }
        // Derived, never client-supplied
        plot.total_price = plot.area * plot.price_per_sq_ft;

        if let Some(plot_type) = input.plot_type {
            plot.plot_type = plot_type;
        }
        if let Some(dimensions) = input.dimensions {
            plot.dimensions = dimensions;
        }
        if let Some(customer) = input.customer {
            plot.customer = customer;
        }
        if let Some(final_price) = input.final_price {
            plot.final_price = Some(final_price);
        }
        if let Some(paid_amount) = input.paid_amount {
            plot.paid_amount = Some(paid_amount);
        }
        if let Some(registry_status) = input.registry_status {
            plot.registry_status = registry_status;
        }
        if let Some(registry_date) = input.registry_date {
            let parsed = chrono::DateTime::parse_from_rfc3339(&registry_date).map_err(|_| {
                LedgerError::BadRequest("registry_date must be an RFC 3339 timestamp".into())
            })?;
            plot.registry_date = Some(DateTime::from_chrono(parsed.with_timezone(&chrono::Utc)));
        }
        if let Some(payment_slip) = input.payment_slip {
            plot.payment_slip = Some(payment_slip);
        }
        if let Some(witnesses) = input.witnesses {
            plot.witnesses = witnesses;
        }
        if let Some(facing) = input.facing {
            plot.facing = Some(facing);
        }
        if let Some(corner) = input.corner {
            plot.corner = corner;
        }
        if let Some(more_information) = input.more_information {
            plot.more_information = Some(more_information);
        }

        // Uploaded artifacts accumulate; an update listing two new images must
        // not wipe the ten already attached
        merge_additive(&mut plot.registry_document, input.registry_document);
        merge_additive(&mut plot.plot_images, input.plot_images);

        if let Some(owner_ids) = input.owner_ids {
            let settings = self
                .store
                .load_settings()
                .await?
                .ok_or_else(|| LedgerError::BadRequest("Owners registry is empty".into()))?;
            plot.plot_owners = snapshot_owners(&settings, &owner_ids)?;
        }

        if let Some(status) = input.status {
            if status == PlotStatus::Reserved && old_status != PlotStatus::Reserved
                && !identity.is_admin()
            {
                return Err(LedgerError::Forbidden(
                    "Only an admin can reserve a plot".into(),
                ));
            }
            plot.status = status;
            if status == PlotStatus::Sold && plot.sold_date.is_none() {
                plot.sold_date = Some(DateTime::now());
            }
        }

        self.store.replace_plot(id, plot).await?;
        let plot = self.get(id).await?;

        if old_status != plot.status {
            info!(
                plot = %id,
                number = %plot.plot_number,
                from = %old_status,
                to = %plot.status,
                "Plot status changed"
            );
            if plot.status.triggers_booking() {
                self.bookings.ensure_booking(&plot, identity.user_id).await?;
            }
        }

        self.colonies.recount(plot.colony).await?;
        if old_colony != plot.colony {
            self.colonies.recount(old_colony).await?;
        }

        self.get(id).await
    }

    /// Hard delete. Sold plots and plots with an open booking are protected.
    pub async fn delete(&self, id: ObjectId) -> Result<()> {
        let plot = self.get(id).await?;

        if plot.status.is_delete_protected() {
            return Err(LedgerError::Conflict(format!(
                "Plot {} is sold and cannot be deleted",
                plot.plot_number
            )));
        }
        if self.store.find_open_booking(id).await?.is_some() {
            return Err(LedgerError::Conflict(format!(
                "Plot {} has an open booking; cancel it first",
                plot.plot_number
            )));
        }

        self.store.delete_plot(id).await?;
        self.colonies.recount(plot.colony).await?;
        info!(plot = %id, number = %plot.plot_number, "Deleted plot");
        Ok(())
    }
}

/// Append entries not already present, preserving order
fn merge_additive(existing: &mut Vec<String>, incoming: Vec<String>) {
    for entry in incoming {
        if !existing.contains(&entry) {
            existing.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{BookingStatus, ColonyDoc, PropertyDoc};
    use crate::store::MemoryStore;

    async fn seed(store: &Arc<MemoryStore>) -> (ObjectId, ObjectId) {
        let colony_id = store
            .insert_colony(ColonyDoc::new("Green Valley".to_string(), ObjectId::new()))
            .await
            .unwrap();
        let property_id = store
            .insert_property(PropertyDoc {
                name: "Phase 1".to_string(),
                colony: colony_id,
                created_by: ObjectId::new(),
                ..Default::default()
            })
            .await
            .unwrap();
        (colony_id, property_id)
    }

    fn admin() -> Identity {
        Identity {
            user_id: ObjectId::new(),
            email: "admin@example.com".to_string(),
            role_name: "Admin".to_string(),
            permissions: vec![],
        }
    }

    fn agent() -> Identity {
        Identity {
            user_id: ObjectId::new(),
            email: "agent@example.com".to_string(),
            role_name: "Agent".to_string(),
            permissions: vec!["plot_create".to_string(), "plot_update".to_string()],
        }
    }

    fn basic_input(colony: ObjectId, property: ObjectId) -> CreatePlotInput {
        CreatePlotInput {
            colony,
            property_id: property,
            area: 1200.0,
            price_per_sq_ft: 450.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_numbers_and_computed_price() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let first = service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();
        assert_eq!(first.plot_number, "PLOT-0001");
        assert_eq!(first.total_price, 1200.0 * 450.0);
        assert_eq!(first.status, PlotStatus::Available);

        let second = service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();
        assert_eq!(second.plot_number, "PLOT-0002");
    }

    #[tokio::test]
    async fn create_updates_colony_counts() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();

        let colony_doc = store.find_colony(colony).await.unwrap().unwrap();
        assert_eq!(colony_doc.total_plots, 1);
        assert_eq!(colony_doc.available_plots, 1);
    }

    #[tokio::test]
    async fn bulk_entered_sold_plot_gets_a_booking() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let mut input = basic_input(colony, property);
        input.status = Some(PlotStatus::Sold);
        input.final_price = Some(500_000.0);
        input.paid_amount = Some(500_000.0);
        input.customer = Some(PlotCustomer {
            name: Some("Sita Devi".to_string()),
            ..Default::default()
        });

        let plot = service.create(input, &agent()).await.unwrap();
        assert_eq!(plot.status, PlotStatus::Sold);
        assert!(plot.sold_date.is_some());

        let booking = store
            .find_open_booking(plot._id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
        assert_eq!(booking.total_amount, 500_000.0);
        assert_eq!(booking.remaining_amount, 0.0);
        assert_eq!(booking.customer_details.name.as_deref(), Some("Sita Devi"));

        let colony_doc = store.find_colony(colony).await.unwrap().unwrap();
        assert_eq!(colony_doc.sold_plots, 1);
    }

    #[tokio::test]
    async fn reserved_status_is_admin_only() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let mut input = basic_input(colony, property);
        input.status = Some(PlotStatus::Reserved);
        let err = service.create(input, &agent()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));

        let mut input = basic_input(colony, property);
        input.status = Some(PlotStatus::Reserved);
        let plot = service.create(input, &admin()).await.unwrap();
        assert_eq!(plot.status, PlotStatus::Reserved);
    }

    #[tokio::test]
    async fn create_validates_inputs() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let mut input = basic_input(colony, property);
        input.area = 0.0;
        assert!(matches!(
            service.create(input, &agent()).await.unwrap_err(),
            LedgerError::BadRequest(_)
        ));

        let mut input = basic_input(colony, property);
        input.price_per_sq_ft = -5.0;
        assert!(matches!(
            service.create(input, &agent()).await.unwrap_err(),
            LedgerError::BadRequest(_)
        ));

        // Property belonging to another colony is rejected
        let other_colony = store
            .insert_colony(ColonyDoc::new("Elsewhere".to_string(), ObjectId::new()))
            .await
            .unwrap();
        let mut input = basic_input(other_colony, property);
        input.colony = other_colony;
        assert!(matches!(
            service.create(input, &agent()).await.unwrap_err(),
            LedgerError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn update_recomputes_total_price() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let plot = service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();

        let updated = service
            .update(
                plot._id.unwrap(),
                UpdatePlotInput {
                    area: Some(1500.0),
                    ..Default::default()
                },
                &agent(),
            )
            .await
            .unwrap();
        assert_eq!(updated.total_price, 1500.0 * 450.0);

        let updated = service
            .update(
                plot._id.unwrap(),
                UpdatePlotInput {
                    price_per_sq_ft: Some(500.0),
                    ..Default::default()
                },
                &agent(),
            )
            .await
            .unwrap();
        assert_eq!(updated.total_price, 1500.0 * 500.0);
    }

    #[tokio::test]
    async fn uploads_merge_additively() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let mut input = basic_input(colony, property);
        input.plot_images = vec!["img1.jpg".to_string(), "img2.jpg".to_string()];
        let plot = service.create(input, &agent()).await.unwrap();

        let updated = service
            .update(
                plot._id.unwrap(),
                UpdatePlotInput {
                    plot_images: vec!["img2.jpg".to_string(), "img3.jpg".to_string()],
                    ..Default::default()
                },
                &agent(),
            )
            .await
            .unwrap();
        assert_eq!(updated.plot_images, vec!["img1.jpg", "img2.jpg", "img3.jpg"]);
    }

    #[tokio::test]
    async fn marking_booked_reconciles_the_ledger() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let plot = service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();

        service
            .update(
                plot._id.unwrap(),
                UpdatePlotInput {
                    status: Some(PlotStatus::Booked),
                    ..Default::default()
                },
                &agent(),
            )
            .await
            .unwrap();

        let booking = store
            .find_open_booking(plot._id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn manual_plot_number_is_honored() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let mut input = basic_input(colony, property);
        input.plot_number = Some("A-1".to_string());
        let plot = service.create(input, &agent()).await.unwrap();
        assert_eq!(plot.plot_number, "A-1");

        // Reusing the number within the colony is a conflict, not a retry
        let mut input = basic_input(colony, property);
        input.plot_number = Some("A-1".to_string());
        let err = service.create(input, &agent()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        let mut input = basic_input(colony, property);
        input.plot_number = Some("  ".to_string());
        let err = service.create(input, &agent()).await.unwrap_err();
        assert!(matches!(err, LedgerError::BadRequest(_)));
    }

    #[tokio::test]
    async fn manual_numbers_do_not_derail_the_sequence() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let mut input = basic_input(colony, property);
        input.plot_number = Some("A-1".to_string());
        service.create(input, &agent()).await.unwrap();

        // Generation ignores the manual number entirely
        let auto = service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();
        assert_eq!(auto.plot_number, "PLOT-0001");
    }

    #[tokio::test]
    async fn colony_move_recounts_both_sides() {
        let store = Arc::new(MemoryStore::new());
        let (colony_a, property_a) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let colony_b = store
            .insert_colony(ColonyDoc::new("Riverside".to_string(), ObjectId::new()))
            .await
            .unwrap();
        let property_b = store
            .insert_property(PropertyDoc {
                name: "Phase A".to_string(),
                colony: colony_b,
                created_by: ObjectId::new(),
                ..Default::default()
            })
            .await
            .unwrap();

        let plot = service
            .create(basic_input(colony_a, property_a), &agent())
            .await
            .unwrap();
        assert_eq!(
            store.find_colony(colony_a).await.unwrap().unwrap().total_plots,
            1
        );

        service
            .update(
                plot._id.unwrap(),
                UpdatePlotInput {
                    colony: Some(colony_b),
                    property_id: Some(property_b),
                    ..Default::default()
                },
                &agent(),
            )
            .await
            .unwrap();

        assert_eq!(
            store.find_colony(colony_a).await.unwrap().unwrap().total_plots,
            0
        );
        assert_eq!(
            store.find_colony(colony_b).await.unwrap().unwrap().total_plots,
            1
        );
    }

    #[tokio::test]
    async fn sold_plots_are_delete_protected() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let mut input = basic_input(colony, property);
        input.status = Some(PlotStatus::Sold);
        let plot = service.create(input, &agent()).await.unwrap();

        let err = service.delete(plot._id.unwrap()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_refused_while_booking_open() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let mut input = basic_input(colony, property);
        input.status = Some(PlotStatus::Booked);
        let plot = service.create(input, &agent()).await.unwrap();

        let err = service.delete(plot._id.unwrap()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_frees_the_number_for_reuse() {
        let store = Arc::new(MemoryStore::new());
        let (colony, property) = seed(&store).await;
        let service = PlotService::new(store.clone());

        let first = service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();
        let second = service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();
        assert_eq!(second.plot_number, "PLOT-0002");

        // Deleting the highest plot rewinds the sequence; deleting a lower
        // one does not
        service.delete(second._id.unwrap()).await.unwrap();
        let third = service
            .create(basic_input(colony, property), &agent())
            .await
            .unwrap();
        assert_eq!(third.plot_number, "PLOT-0002");
        let _ = first;
    }
}
