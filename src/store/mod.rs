//! Persistence seam
//!
//! Services talk to a [`Store`] trait object instead of MongoDB directly. The
//! Mongo-backed implementation is the production path; the in-memory one backs
//! dev mode and unit tests, and enforces the same uniqueness rules so the
//! sequencing and booking semantics are exercised identically.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use bson::oid::ObjectId;

use crate::db::schemas::{
    BookingDoc, BookingStatus, ColonyDoc, PlotCounts, PlotDoc, PlotStatus, PropertyDoc, RoleDoc,
    SettingsDoc, UserDoc,
};
use crate::types::Result;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Filter for plot listings
#[derive(Debug, Clone, Default)]
pub struct PlotFilter {
    pub colony: Option<ObjectId>,
    pub property_id: Option<ObjectId>,
    pub status: Option<PlotStatus>,
    /// Exact plot number lookup (e.g. PLOT-0042)
    pub plot_number: Option<String>,
}

/// Filter for booking listings
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub plot: Option<ObjectId>,
    pub status: Option<BookingStatus>,
    pub agent: Option<ObjectId>,
}

/// One page of a listing plus the total match count
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Persistence operations the services are written against
#[async_trait]
pub trait Store: Send + Sync {
    // Colonies
    async fn insert_colony(&self, colony: ColonyDoc) -> Result<ObjectId>;
    async fn find_colony(&self, id: ObjectId) -> Result<Option<ColonyDoc>>;
    async fn list_colonies(&self) -> Result<Vec<ColonyDoc>>;
    async fn replace_colony(&self, id: ObjectId, colony: ColonyDoc) -> Result<()>;
    async fn soft_delete_colony(&self, id: ObjectId) -> Result<bool>;
    /// Overwrite the cached plot counts. Idempotent; later recounts win.
    async fn write_plot_counts(&self, id: ObjectId, counts: PlotCounts) -> Result<()>;

    // Properties
    async fn insert_property(&self, property: PropertyDoc) -> Result<ObjectId>;
    async fn find_property(&self, id: ObjectId) -> Result<Option<PropertyDoc>>;
    async fn list_properties(&self, colony: Option<ObjectId>) -> Result<Vec<PropertyDoc>>;
    async fn replace_property(&self, id: ObjectId, property: PropertyDoc) -> Result<()>;
    async fn soft_delete_property(&self, id: ObjectId) -> Result<bool>;

    // Plots
    async fn insert_plot(&self, plot: PlotDoc) -> Result<ObjectId>;
    async fn find_plot(&self, id: ObjectId) -> Result<Option<PlotDoc>>;
    /// Highest assigned plot number in a colony, by the zero-padded suffix
    async fn highest_plot_number(&self, colony: ObjectId) -> Result<Option<String>>;
    /// Every live plot in a colony (recount input)
    async fn plots_in_colony(&self, colony: ObjectId) -> Result<Vec<PlotDoc>>;
    async fn list_plots(&self, filter: &PlotFilter, skip: u64, limit: i64) -> Result<Page<PlotDoc>>;
    async fn replace_plot(&self, id: ObjectId, plot: PlotDoc) -> Result<()>;
    /// Hard delete; returns whether a document was removed
    async fn delete_plot(&self, id: ObjectId) -> Result<bool>;

    // Bookings
    async fn insert_booking(&self, booking: BookingDoc) -> Result<ObjectId>;
    async fn find_booking(&self, id: ObjectId) -> Result<Option<BookingDoc>>;
    /// The plot's open booking, if any (pending/confirmed/completed/approved)
    async fn find_open_booking(&self, plot: ObjectId) -> Result<Option<BookingDoc>>;
    async fn highest_booking_number(&self) -> Result<Option<String>>;
    async fn replace_booking(&self, id: ObjectId, booking: BookingDoc) -> Result<()>;
    async fn list_bookings(
        &self,
        filter: &BookingFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Page<BookingDoc>>;

    // Users and roles
    async fn insert_user(&self, user: UserDoc) -> Result<ObjectId>;
    async fn find_user(&self, id: ObjectId) -> Result<Option<UserDoc>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDoc>>;
    async fn list_users(&self) -> Result<Vec<UserDoc>>;
    async fn replace_user(&self, id: ObjectId, user: UserDoc) -> Result<()>;
    /// Highest assigned user code for a role prefix (e.g. "AG")
    async fn highest_user_code(&self, prefix: &str) -> Result<Option<String>>;
    async fn insert_role(&self, role: RoleDoc) -> Result<ObjectId>;
    async fn replace_role(&self, id: ObjectId, role: RoleDoc) -> Result<()>;
    async fn find_role(&self, id: ObjectId) -> Result<Option<RoleDoc>>;
    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleDoc>>;
    async fn list_roles(&self) -> Result<Vec<RoleDoc>>;

    // Settings (singleton)
    async fn load_settings(&self) -> Result<Option<SettingsDoc>>;
    async fn save_settings(&self, settings: SettingsDoc) -> Result<()>;
}
