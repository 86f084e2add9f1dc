//! Booking document schema
//!
//! Records a reservation/sale transaction against exactly one plot. At most
//! one booking in an open status may exist per plot; cancelled and historical
//! bookings stay queryable, so this is a partial unique index rather than a
//! plain uniqueness constraint.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for bookings
pub const BOOKING_COLLECTION: &str = "bookings";

/// Fixed textual prefix for generated booking numbers
pub const BOOKING_NUMBER_PREFIX: &str = "BK";
/// Zero-padded width of the numeric suffix
pub const BOOKING_NUMBER_WIDTH: usize = 6;

/// Booking lifecycle status
///
/// `Approved` is a legacy value still present in historical data; it counts as
/// open but is never written by new code paths.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Approved,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Statuses that count as the plot's single open booking
    pub const OPEN: [BookingStatus; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Completed,
        Self::Approved,
    ];

    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }

    /// Wire names of the open set, for store-layer filters
    pub fn open_names() -> [&'static str; 4] {
        ["pending", "confirmed", "completed", "approved"]
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Inline buyer details when the buyer is not a registered customer
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CustomerDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhar_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_number: Option<String>,
}

/// Payment installment status
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
}

/// One installment of a booking's payment schedule
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Installment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: InstallmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_date: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// Booking document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BookingDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    /// Sequential, pattern BKNNNNNN
    pub booking_number: String,

    /// The plot this booking reserves or sells
    pub plot: ObjectId,

    /// Registered buyer, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<ObjectId>,

    /// Inline buyer snapshot when no registered customer exists
    #[serde(default)]
    pub customer_details: CustomerDetails,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<ObjectId>,

    pub total_amount: f64,

    #[serde(default)]
    pub advance_amount: f64,

    /// Always total_amount - advance_amount
    pub remaining_amount: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payment_schedule: Vec<Installment>,

    #[serde(default)]
    pub status: BookingStatus,

    pub booking_date: DateTime,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_date: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_date: Option<DateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,

    pub created_by: ObjectId,
}

impl Default for BookingDoc {
    fn default() -> Self {
        Self {
            _id: None,
            metadata: Metadata::default(),
            booking_number: String::new(),
            plot: ObjectId::new(),
            buyer: None,
            customer_details: CustomerDetails::default(),
            agent: None,
            total_amount: 0.0,
            advance_amount: 0.0,
            remaining_amount: 0.0,
            payment_schedule: Vec::new(),
            status: BookingStatus::default(),
            booking_date: DateTime::now(),
            completion_date: None,
            cancellation_date: None,
            cancellation_reason: None,
            created_by: ObjectId::new(),
        }
    }
}

impl IntoIndexes for BookingDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "booking_number": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("booking_number_unique".to_string())
                        .build(),
                ),
            ),
            // At most one open booking per plot. Partial so cancelled and
            // historical bookings stay queryable.
            (
                doc! { "plot": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! {
                            "status": { "$in": BookingStatus::open_names().to_vec() }
                        })
                        .name("plot_open_booking_unique".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for BookingDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_statuses() {
        assert!(BookingStatus::Pending.is_open());
        assert!(BookingStatus::Confirmed.is_open());
        assert!(BookingStatus::Completed.is_open());
        assert!(BookingStatus::Approved.is_open());
        assert!(!BookingStatus::Cancelled.is_open());
    }

    #[test]
    fn test_status_wire_names() {
        for name in BookingStatus::open_names() {
            let status: BookingStatus =
                serde_json::from_str(&format!("\"{}\"", name)).unwrap();
            assert!(status.is_open());
        }
    }
}
