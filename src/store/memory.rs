//! In-memory store
//!
//! Backs dev mode (no MongoDB required) and unit tests. A single mutex around
//! the whole state makes each operation atomic, which is what lets this
//! implementation enforce the same uniqueness rules the Mongo indexes do:
//! plot numbers per colony, one open booking per plot, user emails and codes,
//! booking numbers, role names. Violations surface as `Conflict`, exactly like
//! a duplicate-key error from MongoDB.

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::db::mongo::MutMetadata;
use crate::db::schemas::{
    is_sequential_plot_number, BookingDoc, ColonyDoc, PlotCounts, PlotDoc, PropertyDoc, RoleDoc,
    SettingsDoc, UserDoc,
};
use crate::store::{BookingFilter, Page, PlotFilter, Store};
use crate::types::{LedgerError, Result};

#[derive(Default)]
struct Inner {
    colonies: HashMap<ObjectId, ColonyDoc>,
    properties: HashMap<ObjectId, PropertyDoc>,
    plots: HashMap<ObjectId, PlotDoc>,
    bookings: HashMap<ObjectId, BookingDoc>,
    users: HashMap<ObjectId, UserDoc>,
    roles: HashMap<ObjectId, RoleDoc>,
    settings: Option<SettingsDoc>,
}

impl Inner {
    fn live_plots(&self) -> impl Iterator<Item = &PlotDoc> {
        self.plots.values().filter(|p| !p.metadata.is_deleted)
    }

    fn live_bookings(&self) -> impl Iterator<Item = &BookingDoc> {
        self.bookings.values().filter(|b| !b.metadata.is_deleted)
    }

    fn check_plot_unique(&self, plot: &PlotDoc, skip: Option<ObjectId>) -> Result<()> {
        let clash = self.live_plots().any(|p| {
            p._id != skip && p.colony == plot.colony && p.plot_number == plot.plot_number
        });
        if clash {
            return Err(LedgerError::Conflict(format!(
                "Duplicate key: plot number {} already exists in colony",
                plot.plot_number
            )));
        }
        Ok(())
    }

    fn check_booking_unique(&self, booking: &BookingDoc, skip: Option<ObjectId>) -> Result<()> {
        if self
            .live_bookings()
            .any(|b| b._id != skip && b.booking_number == booking.booking_number)
        {
            return Err(LedgerError::Conflict(format!(
                "Duplicate key: booking number {} already exists",
                booking.booking_number
            )));
        }
        if booking.status.is_open()
            && self
                .live_bookings()
                .any(|b| b._id != skip && b.plot == booking.plot && b.status.is_open())
        {
            return Err(LedgerError::Conflict(
                "Duplicate key: plot already has an open booking".to_string(),
            ));
        }
        Ok(())
    }

    fn check_user_unique(&self, user: &UserDoc, skip: Option<ObjectId>) -> Result<()> {
        let clash = self.users.values().any(|u| {
            u._id != skip
                && !u.metadata.is_deleted
                && (u.email == user.email
                    || (u.user_code.is_some() && u.user_code == user.user_code))
        });
        if clash {
            return Err(LedgerError::Conflict(format!(
                "Duplicate key: user email or code already exists ({})",
                user.email
            )));
        }
        Ok(())
    }
}

fn stamp_insert<T: MutMetadata>(item: &mut T) -> ObjectId {
    let metadata = item.mut_metadata();
    metadata.is_deleted = false;
    metadata.created_at = Some(DateTime::now());
    metadata.updated_at = Some(DateTime::now());
    ObjectId::new()
}

fn paginate<T: Clone>(items: Vec<T>, skip: u64, limit: i64) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(skip as usize)
        .take(limit.max(0) as usize)
        .collect();
    Page { items, total }
}

/// Store implementation holding everything in process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_colony(&self, mut colony: ColonyDoc) -> Result<ObjectId> {
        let mut inner = self.inner.lock().await;
        let id = stamp_insert(&mut colony);
        colony._id = Some(id);
        inner.colonies.insert(id, colony);
        Ok(id)
    }

    async fn find_colony(&self, id: ObjectId) -> Result<Option<ColonyDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .colonies
            .get(&id)
            .filter(|c| !c.metadata.is_deleted)
            .cloned())
    }

    async fn list_colonies(&self) -> Result<Vec<ColonyDoc>> {
        let inner = self.inner.lock().await;
        let mut colonies: Vec<ColonyDoc> = inner
            .colonies
            .values()
            .filter(|c| !c.metadata.is_deleted)
            .cloned()
            .collect();
        colonies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(colonies)
    }

    async fn replace_colony(&self, id: ObjectId, mut colony: ColonyDoc) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.colonies.contains_key(&id) {
            return Err(LedgerError::NotFound("Colony not found".to_string()));
        }
        colony._id = Some(id);
        colony.metadata.updated_at = Some(DateTime::now());
        inner.colonies.insert(id, colony);
        Ok(())
    }

    async fn soft_delete_colony(&self, id: ObjectId) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.colonies.get_mut(&id) {
            Some(colony) if !colony.metadata.is_deleted => {
                colony.metadata.is_deleted = true;
                colony.metadata.deleted_at = Some(DateTime::now());
                colony.metadata.updated_at = Some(DateTime::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn write_plot_counts(&self, id: ObjectId, counts: PlotCounts) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(colony) = inner.colonies.get_mut(&id) {
            colony.total_plots = counts.total;
            colony.available_plots = counts.available;
            colony.sold_plots = counts.sold;
            colony.blocked_plots = counts.blocked;
            colony.metadata.updated_at = Some(DateTime::now());
        }
        Ok(())
    }

    async fn insert_property(&self, mut property: PropertyDoc) -> Result<ObjectId> {
        let mut inner = self.inner.lock().await;
        let id = stamp_insert(&mut property);
        property._id = Some(id);
        inner.properties.insert(id, property);
        Ok(id)
    }

    async fn find_property(&self, id: ObjectId) -> Result<Option<PropertyDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .properties
            .get(&id)
            .filter(|p| !p.metadata.is_deleted)
            .cloned())
    }

    async fn list_properties(&self, colony: Option<ObjectId>) -> Result<Vec<PropertyDoc>> {
        let inner = self.inner.lock().await;
        let mut properties: Vec<PropertyDoc> = inner
            .properties
            .values()
            .filter(|p| !p.metadata.is_deleted)
            .filter(|p| colony.is_none_or(|c| p.colony == c))
            .cloned()
            .collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(properties)
    }

    async fn replace_property(&self, id: ObjectId, mut property: PropertyDoc) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.properties.contains_key(&id) {
            return Err(LedgerError::NotFound("Property not found".to_string()));
        }
        property._id = Some(id);
        property.metadata.updated_at = Some(DateTime::now());
        inner.properties.insert(id, property);
        Ok(())
    }

    async fn soft_delete_property(&self, id: ObjectId) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.properties.get_mut(&id) {
            Some(property) if !property.metadata.is_deleted => {
                property.metadata.is_deleted = true;
                property.metadata.deleted_at = Some(DateTime::now());
                property.metadata.updated_at = Some(DateTime::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_plot(&self, mut plot: PlotDoc) -> Result<ObjectId> {
        let mut inner = self.inner.lock().await;
        inner.check_plot_unique(&plot, None)?;
        let id = stamp_insert(&mut plot);
        plot._id = Some(id);
        inner.plots.insert(id, plot);
        Ok(id)
    }

    async fn find_plot(&self, id: ObjectId) -> Result<Option<PlotDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .plots
            .get(&id)
            .filter(|p| !p.metadata.is_deleted)
            .cloned())
    }

    async fn highest_plot_number(&self, colony: ObjectId) -> Result<Option<String>> {
        let inner = self.inner.lock().await;
        let highest = inner
            .live_plots()
            .filter(|p| p.colony == colony && is_sequential_plot_number(&p.plot_number))
            .map(|p| p.plot_number.clone())
            .max();
        Ok(highest)
    }

    async fn plots_in_colony(&self, colony: ObjectId) -> Result<Vec<PlotDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .live_plots()
            .filter(|p| p.colony == colony)
            .cloned()
            .collect())
    }

    async fn list_plots(
        &self,
        filter: &PlotFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Page<PlotDoc>> {
        let inner = self.inner.lock().await;
        let mut plots: Vec<PlotDoc> = inner
            .live_plots()
            .filter(|p| filter.colony.is_none_or(|c| p.colony == c))
            .filter(|p| filter.property_id.is_none_or(|id| p.property_id == id))
            .filter(|p| filter.status.is_none_or(|s| p.status == s))
            .filter(|p| {
                filter
                    .plot_number
                    .as_ref()
                    .is_none_or(|n| &p.plot_number == n)
            })
            .cloned()
            .collect();
        plots.sort_by(|a, b| a.plot_number.cmp(&b.plot_number));
        Ok(paginate(plots, skip, limit))
    }

    async fn replace_plot(&self, id: ObjectId, mut plot: PlotDoc) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.plots.contains_key(&id) {
            return Err(LedgerError::NotFound("Plot not found".to_string()));
        }
        plot._id = Some(id);
        inner.check_plot_unique(&plot, Some(id))?;
        plot.metadata.updated_at = Some(DateTime::now());
        inner.plots.insert(id, plot);
        Ok(())
    }

    async fn delete_plot(&self, id: ObjectId) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner.plots.remove(&id).is_some())
    }

    async fn insert_booking(&self, mut booking: BookingDoc) -> Result<ObjectId> {
        let mut inner = self.inner.lock().await;
        inner.check_booking_unique(&booking, None)?;
        let id = stamp_insert(&mut booking);
        booking._id = Some(id);
        inner.bookings.insert(id, booking);
        Ok(id)
    }

    async fn find_booking(&self, id: ObjectId) -> Result<Option<BookingDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .bookings
            .get(&id)
            .filter(|b| !b.metadata.is_deleted)
            .cloned())
    }

    async fn find_open_booking(&self, plot: ObjectId) -> Result<Option<BookingDoc>> {
        let inner = self.inner.lock().await;
        let found = inner
            .live_bookings()
            .find(|b| b.plot == plot && b.status.is_open())
            .cloned();
        Ok(found)
    }

    async fn highest_booking_number(&self) -> Result<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner.live_bookings().map(|b| b.booking_number.clone()).max())
    }

    async fn replace_booking(&self, id: ObjectId, mut booking: BookingDoc) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.bookings.contains_key(&id) {
            return Err(LedgerError::NotFound("Booking not found".to_string()));
        }
        booking._id = Some(id);
        inner.check_booking_unique(&booking, Some(id))?;
        booking.metadata.updated_at = Some(DateTime::now());
        inner.bookings.insert(id, booking);
        Ok(())
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Page<BookingDoc>> {
        let inner = self.inner.lock().await;
        let mut bookings: Vec<BookingDoc> = inner
            .live_bookings()
            .filter(|b| filter.plot.is_none_or(|p| b.plot == p))
            .filter(|b| filter.status.is_none_or(|s| b.status == s))
            .filter(|b| filter.agent.is_none_or(|a| b.agent == Some(a)))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
        Ok(paginate(bookings, skip, limit))
    }

    async fn insert_user(&self, mut user: UserDoc) -> Result<ObjectId> {
        let mut inner = self.inner.lock().await;
        inner.check_user_unique(&user, None)?;
        let id = stamp_insert(&mut user);
        user._id = Some(id);
        inner.users.insert(id, user);
        Ok(id)
    }

    async fn find_user(&self, id: ObjectId) -> Result<Option<UserDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .get(&id)
            .filter(|u| !u.metadata.is_deleted)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .find(|u| !u.metadata.is_deleted && u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserDoc>> {
        let inner = self.inner.lock().await;
        let mut users: Vec<UserDoc> = inner
            .users
            .values()
            .filter(|u| !u.metadata.is_deleted)
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn replace_user(&self, id: ObjectId, mut user: UserDoc) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.users.contains_key(&id) {
            return Err(LedgerError::NotFound("User not found".to_string()));
        }
        user._id = Some(id);
        inner.check_user_unique(&user, Some(id))?;
        user.metadata.updated_at = Some(DateTime::now());
        inner.users.insert(id, user);
        Ok(())
    }

    async fn highest_user_code(&self, prefix: &str) -> Result<Option<String>> {
        let needle = format!("{}-", prefix);
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .values()
            .filter(|u| !u.metadata.is_deleted)
            .filter_map(|u| u.user_code.clone())
            .filter(|code| code.starts_with(&needle))
            .max())
    }

    async fn insert_role(&self, mut role: RoleDoc) -> Result<ObjectId> {
        let mut inner = self.inner.lock().await;
        if inner
            .roles
            .values()
            .any(|r| !r.metadata.is_deleted && r.name == role.name)
        {
            return Err(LedgerError::Conflict(format!(
                "Duplicate key: role {} already exists",
                role.name
            )));
        }
        let id = stamp_insert(&mut role);
        role._id = Some(id);
        inner.roles.insert(id, role);
        Ok(id)
    }

    async fn replace_role(&self, id: ObjectId, mut role: RoleDoc) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if !inner.roles.contains_key(&id) {
            return Err(LedgerError::NotFound("Role not found".to_string()));
        }
        if inner
            .roles
            .values()
            .any(|r| r._id != Some(id) && !r.metadata.is_deleted && r.name == role.name)
        {
            return Err(LedgerError::Conflict(format!(
                "Duplicate key: role {} already exists",
                role.name
            )));
        }
        role._id = Some(id);
        role.metadata.updated_at = Some(DateTime::now());
        inner.roles.insert(id, role);
        Ok(())
    }

    async fn find_role(&self, id: ObjectId) -> Result<Option<RoleDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .roles
            .get(&id)
            .filter(|r| !r.metadata.is_deleted)
            .cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .roles
            .values()
            .find(|r| !r.metadata.is_deleted && r.name == name)
            .cloned())
    }

    async fn list_roles(&self) -> Result<Vec<RoleDoc>> {
        let inner = self.inner.lock().await;
        let mut roles: Vec<RoleDoc> = inner
            .roles
            .values()
            .filter(|r| !r.metadata.is_deleted)
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn load_settings(&self) -> Result<Option<SettingsDoc>> {
        let inner = self.inner.lock().await;
        Ok(inner.settings.clone())
    }

    async fn save_settings(&self, mut settings: SettingsDoc) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if settings._id.is_none() {
            settings._id = Some(stamp_insert(&mut settings));
        } else {
            settings.metadata.updated_at = Some(DateTime::now());
        }
        inner.settings = Some(settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{BookingStatus, Metadata, PlotStatus};

    fn plot(colony: ObjectId, number: &str) -> PlotDoc {
        PlotDoc {
            plot_number: number.to_string(),
            colony,
            property_id: ObjectId::new(),
            area: 1000.0,
            price_per_sq_ft: 500.0,
            total_price: 500_000.0,
            created_by: ObjectId::new(),
            ..Default::default()
        }
    }

    fn booking(plot_id: ObjectId, number: &str, status: BookingStatus) -> BookingDoc {
        BookingDoc {
            booking_number: number.to_string(),
            plot: plot_id,
            total_amount: 500_000.0,
            remaining_amount: 500_000.0,
            status,
            booking_date: DateTime::now(),
            created_by: ObjectId::new(),
            metadata: Metadata::new(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn duplicate_plot_number_in_colony_conflicts() {
        let store = MemoryStore::new();
        let colony = ObjectId::new();
        store.insert_plot(plot(colony, "PLOT-0001")).await.unwrap();

        let err = store
            .insert_plot(plot(colony, "PLOT-0001"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        // Same number in a different colony is fine
        store
            .insert_plot(plot(ObjectId::new(), "PLOT-0001"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn second_open_booking_for_plot_conflicts() {
        let store = MemoryStore::new();
        let plot_id = ObjectId::new();
        store
            .insert_booking(booking(plot_id, "BK000001", BookingStatus::Pending))
            .await
            .unwrap();

        let err = store
            .insert_booking(booking(plot_id, "BK000002", BookingStatus::Confirmed))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));

        // A cancelled booking does not hold the slot
        store
            .insert_booking(booking(ObjectId::new(), "BK000003", BookingStatus::Cancelled))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancelled_booking_frees_the_plot_slot() {
        let store = MemoryStore::new();
        let plot_id = ObjectId::new();
        let id = store
            .insert_booking(booking(plot_id, "BK000001", BookingStatus::Pending))
            .await
            .unwrap();

        let mut cancelled = store.find_booking(id).await.unwrap().unwrap();
        cancelled.status = BookingStatus::Cancelled;
        store.replace_booking(id, cancelled).await.unwrap();

        store
            .insert_booking(booking(plot_id, "BK000002", BookingStatus::Pending))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn highest_plot_number_scoped_to_colony() {
        let store = MemoryStore::new();
        let a = ObjectId::new();
        let b = ObjectId::new();
        store.insert_plot(plot(a, "PLOT-0001")).await.unwrap();
        store.insert_plot(plot(a, "PLOT-0007")).await.unwrap();
        store.insert_plot(plot(b, "PLOT-0042")).await.unwrap();

        assert_eq!(
            store.highest_plot_number(a).await.unwrap(),
            Some("PLOT-0007".to_string())
        );
        assert_eq!(
            store.highest_plot_number(b).await.unwrap(),
            Some("PLOT-0042".to_string())
        );
        assert_eq!(store.highest_plot_number(ObjectId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn manual_plot_numbers_are_excluded_from_highest() {
        let store = MemoryStore::new();
        let colony = ObjectId::new();
        store.insert_plot(plot(colony, "A-1")).await.unwrap();
        assert_eq!(store.highest_plot_number(colony).await.unwrap(), None);

        store.insert_plot(plot(colony, "PLOT-0003")).await.unwrap();
        assert_eq!(
            store.highest_plot_number(colony).await.unwrap(),
            Some("PLOT-0003".to_string())
        );
    }

    #[tokio::test]
    async fn find_open_booking_skips_cancelled() {
        let store = MemoryStore::new();
        let plot_id = ObjectId::new();
        store
            .insert_booking(booking(plot_id, "BK000001", BookingStatus::Cancelled))
            .await
            .unwrap();
        assert!(store.find_open_booking(plot_id).await.unwrap().is_none());

        store
            .insert_booking(booking(plot_id, "BK000002", BookingStatus::Pending))
            .await
            .unwrap();
        let open = store.find_open_booking(plot_id).await.unwrap().unwrap();
        assert_eq!(open.booking_number, "BK000002");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let role = ObjectId::new();
        let user = UserDoc::new(
            "A".to_string(),
            "a@example.com".to_string(),
            "hash".to_string(),
            role,
        );
        store.insert_user(user.clone()).await.unwrap();
        let err = store.insert_user(user).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_plots_filters_and_paginates() {
        let store = MemoryStore::new();
        let colony = ObjectId::new();
        for i in 1..=5 {
            let mut p = plot(colony, &format!("PLOT-{:04}", i));
            if i == 3 {
                p.status = PlotStatus::Sold;
            }
            store.insert_plot(p).await.unwrap();
        }

        let filter = PlotFilter {
            colony: Some(colony),
            ..Default::default()
        };
        let page = store.list_plots(&filter, 0, 2).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].plot_number, "PLOT-0001");

        let sold = PlotFilter {
            colony: Some(colony),
            status: Some(PlotStatus::Sold),
            ..Default::default()
        };
        let page = store.list_plots(&sold, 0, 10).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].plot_number, "PLOT-0003");
    }
}
