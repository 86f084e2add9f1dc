//! Domain services
//!
//! Everything the HTTP routes do goes through these; they own validation,
//! sequencing, reconciliation and recounting, against a [`crate::store::Store`].

pub mod bookings;
pub mod colonies;
pub mod owners;
pub mod plots;
pub mod properties;
pub mod sequence;
pub mod settings;
pub mod users;

pub use bookings::BookingService;
pub use colonies::ColonyService;
pub use owners::OwnerSyncService;
pub use plots::PlotService;
pub use properties::PropertyService;
pub use settings::SettingsService;
pub use users::UserService;
