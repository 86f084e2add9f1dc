//! Document schemas for the plotledger collections

pub mod booking;
pub mod colony;
pub mod documents;
pub mod metadata;
pub mod plot;
pub mod property;
pub mod settings;
pub mod user;

pub use booking::{
    BookingDoc, BookingStatus, CustomerDetails, Installment, InstallmentStatus,
    BOOKING_COLLECTION, BOOKING_NUMBER_PREFIX, BOOKING_NUMBER_WIDTH,
};
pub use colony::{ColonyDoc, ColonyLocation, PlotCounts, COLONY_COLLECTION};
pub use documents::{DocumentSet, PartyDetails};
pub use metadata::Metadata;
pub use plot::{
    is_sequential_plot_number, OwnerSnapshot, PlotCustomer, PlotDimensions, PlotDoc, PlotStatus,
    PLOT_COLLECTION, PLOT_NUMBER_PATTERN, PLOT_NUMBER_PREFIX, PLOT_NUMBER_WIDTH,
};
pub use property::{PropertyDoc, PropertyStatus, PROPERTY_COLLECTION};
pub use settings::{RegistryParty, SettingsDoc, SETTINGS_COLLECTION};
pub use user::{
    user_code_prefix, RoleDoc, UserDoc, ROLE_COLLECTION, USER_CODE_WIDTH, USER_COLLECTION,
};
