//! Plot document schema
//!
//! The central entity. A plot belongs to exactly one colony and one property,
//! carries a generated `plot_number` unique within its colony, and moves
//! through an explicit status lifecycle. Owner and witness data is embedded as
//! snapshots taken at selection time: the legal identity of the seller at sale
//! time must not change retroactively when the owners registry is edited
//! later.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{
    documents::{DocumentSet, PartyDetails},
    Metadata,
};

/// Collection name for plots
pub const PLOT_COLLECTION: &str = "plots";

/// Fixed textual prefix for generated plot numbers
pub const PLOT_NUMBER_PREFIX: &str = "PLOT-";
/// Zero-padded width of the numeric suffix (keeps lexicographic and numeric
/// ordering aligned)
pub const PLOT_NUMBER_WIDTH: usize = 4;

/// Mongo-side filter matching only generated plot numbers. The suffix may
/// grow past the padded width once a colony exceeds 9999 plots.
pub const PLOT_NUMBER_PATTERN: &str = "^PLOT-[0-9]{4,}$";

/// Whether a plot number came from the colony sequence. Manual overrides
/// (any other format) must be invisible to "highest number" queries or a
/// single odd number would derail generation for the whole colony.
pub fn is_sequential_plot_number(value: &str) -> bool {
    value
        .strip_prefix(PLOT_NUMBER_PREFIX)
        .is_some_and(|suffix| {
            suffix.len() >= PLOT_NUMBER_WIDTH && suffix.bytes().all(|b| b.is_ascii_digit())
        })
}

/// Plot lifecycle status
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlotStatus {
    #[default]
    Available,
    Blocked,
    /// Admin-settable only; automation never drives a plot into or out of it
    Reserved,
    Booked,
    Sold,
}

impl PlotStatus {
    /// Whether entering this status must be reconciled against the booking
    /// ledger (an open booking is created if none exists)
    pub fn triggers_booking(self) -> bool {
        matches!(self, Self::Booked | Self::Sold)
    }

    /// Sold plots are delete-protected
    pub fn is_delete_protected(self) -> bool {
        self == Self::Sold
    }
}

impl fmt::Display for PlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Blocked => "blocked",
            Self::Reserved => "reserved",
            Self::Booked => "booked",
            Self::Sold => "sold",
        };
        write!(f, "{}", s)
    }
}

/// Physical dimensions and adjacency of a plot
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PlotDimensions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
}

/// Denormalized owner snapshot copied from the settings registry at selection
/// time. `owner_id` keeps the link back to the registry entry for the explicit
/// resync batch.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct OwnerSnapshot {
    pub owner_id: String,
    #[serde(flatten)]
    pub details: PartyDetails,
}

/// Buyer/customer fields carried on a booked or sold plot
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PlotCustomer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhar_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_number: Option<String>,
    #[serde(default)]
    pub documents: DocumentSet,
}

/// Plot document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PlotDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Unique within the colony, pattern PLOT-NNNN
    pub plot_number: String,

    #[serde(default = "default_plot_type")]
    pub plot_type: String,

    /// Colony this plot belongs to (the sequence partition key)
    pub colony: ObjectId,

    /// Property this plot belongs to
    pub property_id: ObjectId,

    /// Area in square feet, must be positive
    pub area: f64,

    #[serde(default)]
    pub dimensions: PlotDimensions,

    /// Must be positive
    pub price_per_sq_ft: f64,

    /// Always area * price_per_sq_ft, recomputed on every factor change
    pub total_price: f64,

    #[serde(default)]
    pub status: PlotStatus,

    #[serde(default)]
    pub customer: PlotCustomer,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_date: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<f64>,

    #[serde(default = "default_registry_status")]
    pub registry_status: String,

    /// Uploaded registry document URLs (additive-merge on update)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registry_document: Vec<String>,

    /// Uploaded plot image URLs (additive-merge on update)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plot_images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_slip: Option<String>,

    /// Snapshots of the selling owners, frozen at selection time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plot_owners: Vec<OwnerSnapshot>,

    /// Witnesses supplied inline at sale time
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub witnesses: Vec<PartyDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing: Option<String>,

    #[serde(default)]
    pub corner: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub more_information: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_date: Option<DateTime>,

    pub created_by: ObjectId,
}

fn default_plot_type() -> String {
    "residential".to_string()
}

fn default_registry_status() -> String {
    "pending".to_string()
}

impl PlotDoc {
    /// Effective sale amount: negotiated final price when present, else the
    /// computed total
    pub fn sale_amount(&self) -> f64 {
        self.final_price.unwrap_or(self.total_price)
    }
}

impl IntoIndexes for PlotDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Plot numbers are unique per colony; the sequence generator
            // retries on this index's duplicate-key error
            (
                doc! { "colony": 1, "plot_number": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("colony_plot_number_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "property_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("property_index".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "status": 1 },
                Some(
                    IndexOptions::builder()
                        .name("status_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for PlotDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&PlotStatus::Booked).unwrap();
        assert_eq!(json, "\"booked\"");
        let back: PlotStatus = serde_json::from_str("\"reserved\"").unwrap();
        assert_eq!(back, PlotStatus::Reserved);
    }

    #[test]
    fn test_booking_trigger_statuses() {
        assert!(PlotStatus::Booked.triggers_booking());
        assert!(PlotStatus::Sold.triggers_booking());
        assert!(!PlotStatus::Available.triggers_booking());
        assert!(!PlotStatus::Blocked.triggers_booking());
        assert!(!PlotStatus::Reserved.triggers_booking());
    }

    #[test]
    fn test_sequential_number_recognition() {
        assert!(is_sequential_plot_number("PLOT-0001"));
        assert!(is_sequential_plot_number("PLOT-9999"));
        assert!(is_sequential_plot_number("PLOT-10000"));
        assert!(!is_sequential_plot_number("A-1"));
        assert!(!is_sequential_plot_number("PLOT-12"));
        assert!(!is_sequential_plot_number("PLOT-00A1"));
        assert!(!is_sequential_plot_number("PLOT-"));
    }

    #[test]
    fn test_sale_amount_prefers_final_price() {
        let plot = PlotDoc {
            total_price: 500_000.0,
            final_price: Some(480_000.0),
            ..Default::default()
        };
        assert_eq!(plot.sale_amount(), 480_000.0);

        let plot = PlotDoc {
            total_price: 500_000.0,
            ..Default::default()
        };
        assert_eq!(plot.sale_amount(), 500_000.0);
    }
}
