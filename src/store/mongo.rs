//! MongoDB-backed store
//!
//! Thin mapping from the [`Store`] operations onto the typed collection
//! wrapper. The uniqueness rules live in the collection indexes; duplicate-key
//! violations surface as `Conflict` from the wrapper.

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime, Document};

use crate::db::schemas::{
    BookingDoc, BookingStatus, ColonyDoc, PlotCounts, PlotDoc, PropertyDoc, RoleDoc, SettingsDoc,
    UserDoc, BOOKING_COLLECTION, COLONY_COLLECTION, PLOT_COLLECTION, PLOT_NUMBER_PATTERN,
    PROPERTY_COLLECTION, ROLE_COLLECTION, SETTINGS_COLLECTION, USER_COLLECTION,
};
use crate::db::{MongoClient, MongoCollection};
use crate::store::{BookingFilter, Page, PlotFilter, Store};
use crate::types::Result;

/// Store implementation backed by MongoDB collections
#[derive(Clone)]
pub struct MongoStore {
    colonies: MongoCollection<ColonyDoc>,
    properties: MongoCollection<PropertyDoc>,
    plots: MongoCollection<PlotDoc>,
    bookings: MongoCollection<BookingDoc>,
    users: MongoCollection<UserDoc>,
    roles: MongoCollection<RoleDoc>,
    settings: MongoCollection<SettingsDoc>,
}

impl MongoStore {
    /// Open every collection and apply its indexes
    pub async fn new(client: &MongoClient) -> Result<Self> {
        Ok(Self {
            colonies: client.collection(COLONY_COLLECTION).await?,
            properties: client.collection(PROPERTY_COLLECTION).await?,
            plots: client.collection(PLOT_COLLECTION).await?,
            bookings: client.collection(BOOKING_COLLECTION).await?,
            users: client.collection(USER_COLLECTION).await?,
            roles: client.collection(ROLE_COLLECTION).await?,
            settings: client.collection(SETTINGS_COLLECTION).await?,
        })
    }
}

fn plot_filter_doc(filter: &PlotFilter) -> Document {
    let mut doc = Document::new();
    if let Some(colony) = filter.colony {
        doc.insert("colony", colony);
    }
    if let Some(property_id) = filter.property_id {
        doc.insert("property_id", property_id);
    }
    if let Some(status) = filter.status {
        doc.insert("status", status.to_string());
    }
    if let Some(plot_number) = &filter.plot_number {
        doc.insert("plot_number", plot_number);
    }
    doc
}

fn booking_filter_doc(filter: &BookingFilter) -> Document {
    let mut doc = Document::new();
    if let Some(plot) = filter.plot {
        doc.insert("plot", plot);
    }
    if let Some(status) = filter.status {
        doc.insert("status", status.to_string());
    }
    if let Some(agent) = filter.agent {
        doc.insert("agent", agent);
    }
    doc
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_colony(&self, colony: ColonyDoc) -> Result<ObjectId> {
        self.colonies.insert_one(colony).await
    }

    async fn find_colony(&self, id: ObjectId) -> Result<Option<ColonyDoc>> {
        self.colonies.find_one(doc! { "_id": id }).await
    }

    async fn list_colonies(&self) -> Result<Vec<ColonyDoc>> {
        self.colonies
            .find_many(doc! {}, Some(doc! { "name": 1 }), None, None)
            .await
    }

    async fn replace_colony(&self, id: ObjectId, colony: ColonyDoc) -> Result<()> {
        self.colonies.replace_one(doc! { "_id": id }, colony).await
    }

    async fn soft_delete_colony(&self, id: ObjectId) -> Result<bool> {
        let result = self.colonies.soft_delete(doc! { "_id": id }).await?;
        Ok(result.modified_count > 0)
    }

    async fn write_plot_counts(&self, id: ObjectId, counts: PlotCounts) -> Result<()> {
        self.colonies
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "total_plots": counts.total,
                        "available_plots": counts.available,
                        "sold_plots": counts.sold,
                        "blocked_plots": counts.blocked,
                        "metadata.updated_at": DateTime::now(),
                    }
                },
            )
            .await?;
        Ok(())
    }

    async fn insert_property(&self, property: PropertyDoc) -> Result<ObjectId> {
        self.properties.insert_one(property).await
    }

    async fn find_property(&self, id: ObjectId) -> Result<Option<PropertyDoc>> {
        self.properties.find_one(doc! { "_id": id }).await
    }

    async fn list_properties(&self, colony: Option<ObjectId>) -> Result<Vec<PropertyDoc>> {
        let filter = match colony {
            Some(colony) => doc! { "colony": colony },
            None => doc! {},
        };
        self.properties
            .find_many(filter, Some(doc! { "name": 1 }), None, None)
            .await
    }

    async fn replace_property(&self, id: ObjectId, property: PropertyDoc) -> Result<()> {
        self.properties
            .replace_one(doc! { "_id": id }, property)
            .await
    }

    async fn soft_delete_property(&self, id: ObjectId) -> Result<bool> {
        let result = self.properties.soft_delete(doc! { "_id": id }).await?;
        Ok(result.modified_count > 0)
    }

    async fn insert_plot(&self, plot: PlotDoc) -> Result<ObjectId> {
        self.plots.insert_one(plot).await
    }

    async fn find_plot(&self, id: ObjectId) -> Result<Option<PlotDoc>> {
        self.plots.find_one(doc! { "_id": id }).await
    }

    async fn highest_plot_number(&self, colony: ObjectId) -> Result<Option<String>> {
        // Zero-padding keeps lexicographic order equal to numeric order.
        // Restricted to generated numbers so manual overrides stay out of
        // the sequence.
        let found = self
            .plots
            .find_one_sorted(
                doc! {
                    "colony": colony,
                    "plot_number": { "$regex": PLOT_NUMBER_PATTERN },
                },
                doc! { "plot_number": -1 },
            )
            .await?;
        Ok(found.map(|p| p.plot_number))
    }

    async fn plots_in_colony(&self, colony: ObjectId) -> Result<Vec<PlotDoc>> {
        self.plots
            .find_many(doc! { "colony": colony }, None, None, None)
            .await
    }

    async fn list_plots(
        &self,
        filter: &PlotFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Page<PlotDoc>> {
        let filter_doc = plot_filter_doc(filter);
        let total = self.plots.count(filter_doc.clone()).await?;
        let items = self
            .plots
            .find_many(
                filter_doc,
                Some(doc! { "plot_number": 1 }),
                Some(skip),
                Some(limit),
            )
            .await?;
        Ok(Page { items, total })
    }

    async fn replace_plot(&self, id: ObjectId, plot: PlotDoc) -> Result<()> {
        self.plots.replace_one(doc! { "_id": id }, plot).await
    }

    async fn delete_plot(&self, id: ObjectId) -> Result<bool> {
        let deleted = self.plots.delete_one(doc! { "_id": id }).await?;
        Ok(deleted > 0)
    }

    async fn insert_booking(&self, booking: BookingDoc) -> Result<ObjectId> {
        self.bookings.insert_one(booking).await
    }

    async fn find_booking(&self, id: ObjectId) -> Result<Option<BookingDoc>> {
        self.bookings.find_one(doc! { "_id": id }).await
    }

    async fn find_open_booking(&self, plot: ObjectId) -> Result<Option<BookingDoc>> {
        self.bookings
            .find_one(doc! {
                "plot": plot,
                "status": { "$in": BookingStatus::open_names().to_vec() },
            })
            .await
    }

    async fn highest_booking_number(&self) -> Result<Option<String>> {
        let found = self
            .bookings
            .find_one_sorted(doc! {}, doc! { "booking_number": -1 })
            .await?;
        Ok(found.map(|b| b.booking_number))
    }

    async fn replace_booking(&self, id: ObjectId, booking: BookingDoc) -> Result<()> {
        self.bookings.replace_one(doc! { "_id": id }, booking).await
    }

    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Page<BookingDoc>> {
        let filter_doc = booking_filter_doc(filter);
        let total = self.bookings.count(filter_doc.clone()).await?;
        let items = self
            .bookings
            .find_many(
                filter_doc,
                Some(doc! { "booking_date": -1 }),
                Some(skip),
                Some(limit),
            )
            .await?;
        Ok(Page { items, total })
    }

    async fn insert_user(&self, user: UserDoc) -> Result<ObjectId> {
        self.users.insert_one(user).await
    }

    async fn find_user(&self, id: ObjectId) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "_id": id }).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>> {
        self.users.find_one(doc! { "email": email }).await
    }

    async fn list_users(&self) -> Result<Vec<UserDoc>> {
        self.users
            .find_many(doc! {}, Some(doc! { "name": 1 }), None, None)
            .await
    }

    async fn replace_user(&self, id: ObjectId, user: UserDoc) -> Result<()> {
        self.users.replace_one(doc! { "_id": id }, user).await
    }

    async fn highest_user_code(&self, prefix: &str) -> Result<Option<String>> {
        let found = self
            .users
            .find_one_sorted(
                doc! { "user_code": { "$regex": format!("^{}-", prefix) } },
                doc! { "user_code": -1 },
            )
            .await?;
        Ok(found.and_then(|u| u.user_code))
    }

    async fn insert_role(&self, role: RoleDoc) -> Result<ObjectId> {
        self.roles.insert_one(role).await
    }

    async fn replace_role(&self, id: ObjectId, role: RoleDoc) -> Result<()> {
        self.roles.replace_one(doc! { "_id": id }, role).await
    }

    async fn find_role(&self, id: ObjectId) -> Result<Option<RoleDoc>> {
        self.roles.find_one(doc! { "_id": id }).await
    }

    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleDoc>> {
        self.roles.find_one(doc! { "name": name }).await
    }

    async fn list_roles(&self) -> Result<Vec<RoleDoc>> {
        self.roles
            .find_many(doc! {}, Some(doc! { "name": 1 }), None, None)
            .await
    }

    async fn load_settings(&self) -> Result<Option<SettingsDoc>> {
        self.settings.find_one(doc! {}).await
    }

    async fn save_settings(&self, settings: SettingsDoc) -> Result<()> {
        match settings._id {
            Some(id) => self.settings.replace_one(doc! { "_id": id }, settings).await,
            None => {
                self.settings.insert_one(settings).await?;
                Ok(())
            }
        }
    }
}
