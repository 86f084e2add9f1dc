//! Booking reconciliation against the plot ledger
//!
//! A plot has at most one open booking. The two entry points keep plots and
//! bookings agreeing with each other:
//!
//! - [`BookingService::ensure_booking`] runs when a plot is written into a
//!   booked or sold status. If the plot already has an open booking nothing is
//!   rewritten (a sale only moves it forward to completed); otherwise one is
//!   synthesized from the plot's own customer and price fields, so a
//!   bulk-entered sold plot still gets a ledger entry.
//! - [`BookingService::create_booking`] is the explicit path: it requires an
//!   available plot and moves it to blocked.
//!
//! The one-open-booking rule is ultimately enforced by the store (a partial
//! unique index in MongoDB). A conflict on insert means another writer got
//! there first; ensure_booking treats that as "already done" after
//! re-reading, create_booking surfaces it.

use bson::{oid::ObjectId, DateTime};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{
    BookingDoc, BookingStatus, CustomerDetails, Installment, Metadata, PlotDoc, PlotStatus,
};
use crate::services::colonies::ColonyService;
use crate::services::sequence;
use crate::store::{BookingFilter, Page, Store};
use crate::types::{LedgerError, Result};

/// Attempts at generating a booking number before giving up
const NUMBER_ATTEMPTS: usize = 3;

/// Fields accepted when creating a booking
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBookingInput {
    pub plot: ObjectId,
    #[serde(default)]
    pub buyer: Option<ObjectId>,
    #[serde(default)]
    pub customer_details: CustomerDetails,
    #[serde(default)]
    pub agent: Option<ObjectId>,
    /// Defaults to the plot's sale amount
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub advance_amount: f64,
    #[serde(default)]
    pub payment_schedule: Vec<Installment>,
}

/// Fields accepted when updating a booking
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookingInput {
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub advance_amount: Option<f64>,
    #[serde(default)]
    pub payment_schedule: Option<Vec<Installment>>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub agent: Option<ObjectId>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
}

#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn Store>,
    colonies: ColonyService,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let colonies = ColonyService::new(store.clone());
        Self { store, colonies }
    }

    pub async fn get(&self, id: ObjectId) -> Result<BookingDoc> {
        self.store
            .find_booking(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Booking not found".into()))
    }

    pub async fn list(
        &self,
        filter: &BookingFilter,
        skip: u64,
        limit: i64,
    ) -> Result<Page<BookingDoc>> {
        self.store.list_bookings(filter, skip, limit).await
    }

    /// Open booking for a plot, if one exists
    pub async fn open_for_plot(&self, plot: ObjectId) -> Result<Option<BookingDoc>> {
        self.store.find_open_booking(plot).await
    }

    /// Make the booking ledger agree with a plot that sits in a booked or
    /// sold status. Called by the plot service after such a write.
    pub async fn ensure_booking(&self, plot: &PlotDoc, actor: ObjectId) -> Result<BookingDoc> {
        let plot_id = plot
            ._id
            .ok_or_else(|| LedgerError::Internal("Plot has no id".into()))?;
        let target_status = match plot.status {
            PlotStatus::Booked => BookingStatus::Pending,
            PlotStatus::Sold => BookingStatus::Completed,
            other => {
                return Err(LedgerError::Internal(format!(
                    "ensure_booking called for plot in status {}",
                    other
                )))
            }
        };

        if let Some(open) = self.store.find_open_booking(plot_id).await? {
            return self.align_booking(open, plot, target_status).await;
        }

        let mut last_conflict = None;
        for _ in 0..NUMBER_ATTEMPTS {
            let number = sequence::next_booking_number(self.store.as_ref()).await?;
            let booking = self.booking_from_plot(number, plot, plot_id, target_status, actor);

            match self.store.insert_booking(booking).await {
                Ok(id) => {
                    info!(booking = %id, plot = %plot_id, "Synthesized booking for plot");
                    return self.get(id).await;
                }
                Err(LedgerError::Conflict(msg)) => {
                    // Either the booking number raced or another writer just
                    // opened a booking for this plot. Re-read to find out.
                    if let Some(open) = self.store.find_open_booking(plot_id).await? {
                        return self.align_booking(open, plot, target_status).await;
                    }
                    last_conflict = Some(msg);
                }
                Err(e) => return Err(e),
            }
        }

        Err(LedgerError::Sequencing(format!(
            "Could not allocate a booking number after {} attempts: {}",
            NUMBER_ATTEMPTS,
            last_conflict.unwrap_or_default()
        )))
    }

    /// An existing open booking is left alone; operator-entered figures on it
    /// are authoritative over the plot's fields. The single exception is the
    /// forward move to completed when the plot is sold — and a completed
    /// booking is never demoted by a later plot edit.
    async fn align_booking(
        &self,
        mut booking: BookingDoc,
        plot: &PlotDoc,
        target_status: BookingStatus,
    ) -> Result<BookingDoc> {
        if target_status != BookingStatus::Completed || booking.status == BookingStatus::Completed {
            return Ok(booking);
        }

        let id = booking
            ._id
            .ok_or_else(|| LedgerError::Internal("Booking has no id".into()))?;
        booking.status = BookingStatus::Completed;
        booking.completion_date = Some(plot.sold_date.unwrap_or_else(DateTime::now));

        self.store.replace_booking(id, booking).await?;
        self.get(id).await
    }

    fn booking_from_plot(
        &self,
        booking_number: String,
        plot: &PlotDoc,
        plot_id: ObjectId,
        status: BookingStatus,
        actor: ObjectId,
    ) -> BookingDoc {
        let total_amount = plot.sale_amount();
        let advance_amount = plot.paid_amount.unwrap_or(0.0);

        BookingDoc {
            _id: None,
            metadata: Metadata::new(),
            booking_number,
            plot: plot_id,
            buyer: None,
            customer_details: CustomerDetails {
                name: plot.customer.name.clone(),
                phone: plot.customer.phone.clone(),
                address: plot
                    .customer
                    .full_address
                    .clone()
                    .or_else(|| plot.customer.short_address.clone()),
                aadhar_number: plot.customer.aadhar_number.clone(),
                pan_number: plot.customer.pan_number.clone(),
            },
            agent: None,
            total_amount,
            advance_amount,
            remaining_amount: total_amount - advance_amount,
            payment_schedule: Vec::new(),
            status,
            // Bulk-entered ledgers carry the registry date; it is the real
            // transaction date, not the moment of data entry
            booking_date: plot.registry_date.unwrap_or_else(DateTime::now),
            completion_date: (status == BookingStatus::Completed)
                .then(|| plot.sold_date.unwrap_or_else(DateTime::now)),
            cancellation_date: None,
            cancellation_reason: None,
            created_by: actor,
        }
    }

    /// Explicit booking creation. The plot must be available; it moves to
    /// blocked and its colony counts are recounted.
    pub async fn create(&self, input: CreateBookingInput, actor: ObjectId) -> Result<BookingDoc> {
        let mut plot = self
            .store
            .find_plot(input.plot)
            .await?
            .ok_or_else(|| LedgerError::NotFound("Plot not found".into()))?;

        if plot.status != PlotStatus::Available {
            return Err(LedgerError::Conflict(format!(
                "Plot {} is not available for booking (status: {})",
                plot.plot_number, plot.status
            )));
        }

        let total_amount = input.total_amount.unwrap_or_else(|| plot.sale_amount());
        if total_amount <= 0.0 {
            return Err(LedgerError::BadRequest(
                "Booking amount must be positive".into(),
            ));
        }
        if input.advance_amount < 0.0 || input.advance_amount > total_amount {
            return Err(LedgerError::BadRequest(
                "Advance must be between zero and the total amount".into(),
            ));
        }

        let mut booking_id = None;
        let mut last_conflict = None;
        for _ in 0..NUMBER_ATTEMPTS {
            let number = sequence::next_booking_number(self.store.as_ref()).await?;
            let booking = BookingDoc {
                _id: None,
                metadata: Metadata::new(),
                booking_number: number,
                plot: input.plot,
                buyer: input.buyer,
                customer_details: input.customer_details.clone(),
                agent: input.agent,
                total_amount,
                advance_amount: input.advance_amount,
                remaining_amount: total_amount - input.advance_amount,
                payment_schedule: input.payment_schedule.clone(),
                status: BookingStatus::Pending,
                booking_date: DateTime::now(),
                completion_date: None,
                cancellation_date: None,
                cancellation_reason: None,
                created_by: actor,
            };

            match self.store.insert_booking(booking).await {
                Ok(id) => {
                    booking_id = Some(id);
                    break;
                }
                Err(LedgerError::Conflict(msg)) => {
                    // The plot slot itself may have been taken while we were
                    // allocating a number
                    if self.store.find_open_booking(input.plot).await?.is_some() {
                        return Err(LedgerError::Conflict(
                            "Plot already has an open booking".into(),
                        ));
                    }
                    last_conflict = Some(msg);
                }
                Err(e) => return Err(e),
            }
        }

        let booking_id = booking_id.ok_or_else(|| {
            LedgerError::Sequencing(format!(
                "Could not allocate a booking number after {} attempts: {}",
                NUMBER_ATTEMPTS,
                last_conflict.unwrap_or_default()
            ))
        })?;

        // The booking holds the plot
        let plot_id = input.plot;
        plot.status = PlotStatus::Blocked;
        if input.customer_details.name.is_some() {
            plot.customer.name = input.customer_details.name.clone();
            plot.customer.phone = input.customer_details.phone.clone();
            plot.customer.full_address = input.customer_details.address.clone();
            plot.customer.aadhar_number = input.customer_details.aadhar_number.clone();
            plot.customer.pan_number = input.customer_details.pan_number.clone();
        }
        plot.paid_amount = Some(input.advance_amount);
        let colony = plot.colony;
        self.store.replace_plot(plot_id, plot).await?;
        self.colonies.recount(colony).await?;

        info!(booking = %booking_id, plot = %plot_id, "Created booking, plot blocked");
        self.get(booking_id).await
    }

    /// Cancel an open booking and release the plot back to available
    pub async fn cancel(&self, id: ObjectId, reason: Option<String>) -> Result<BookingDoc> {
        let mut booking = self.get(id).await?;

        if !booking.status.is_open() {
            return Err(LedgerError::Conflict(format!(
                "Booking {} is not open (status: {})",
                booking.booking_number, booking.status
            )));
        }

        booking.status = BookingStatus::Cancelled;
        booking.cancellation_date = Some(DateTime::now());
        booking.cancellation_reason = reason;
        self.store.replace_booking(id, booking.clone()).await?;

        // Release the plot
        match self.store.find_plot(booking.plot).await? {
            Some(mut plot) => {
                let plot_id = booking.plot;
                let colony = plot.colony;
                plot.status = PlotStatus::Available;
                plot.customer = Default::default();
                plot.paid_amount = None;
                plot.sold_date = None;
                self.store.replace_plot(plot_id, plot).await?;
                self.colonies.recount(colony).await?;
            }
            None => {
                warn!(booking = %id, plot = %booking.plot, "Cancelled booking for a missing plot");
            }
        }

        info!(booking = %id, "Cancelled booking, plot released");
        self.get(id).await
    }

    /// Update an open booking. Completing it marks the plot sold; cancelling
    /// goes through the cancel path.
    pub async fn update(&self, id: ObjectId, input: UpdateBookingInput) -> Result<BookingDoc> {
        if input.status == Some(BookingStatus::Cancelled) {
            return self.cancel(id, input.cancellation_reason).await;
        }

        let mut booking = self.get(id).await?;
        if !booking.status.is_open() {
            return Err(LedgerError::Conflict(format!(
                "Booking {} is cancelled and cannot be updated",
                booking.booking_number
            )));
        }

        if let Some(total) = input.total_amount {
            if total <= 0.0 {
                return Err(LedgerError::BadRequest(
                    "Booking amount must be positive".into(),
                ));
            }
            booking.total_amount = total;
        }
        if let Some(advance) = input.advance_amount {
            if advance < 0.0 {
                return Err(LedgerError::BadRequest("Advance cannot be negative".into()));
            }
            booking.advance_amount = advance;
        }
        if booking.advance_amount > booking.total_amount {
            return Err(LedgerError::BadRequest(
                "Advance must be between zero and the total amount".into(),
            ));
        }
        booking.remaining_amount = booking.total_amount - booking.advance_amount;

        if let Some(schedule) = input.payment_schedule {
            booking.payment_schedule = schedule;
        }
        if let Some(details) = input.customer_details {
            booking.customer_details = details;
        }
        if let Some(agent) = input.agent {
            booking.agent = Some(agent);
        }

        let mut completed_now = false;
        if let Some(status) = input.status {
            match status {
                BookingStatus::Approved => {
                    return Err(LedgerError::BadRequest(
                        "Status 'approved' is read-only legacy data".into(),
                    ));
                }
                BookingStatus::Completed if booking.status != BookingStatus::Completed => {
                    booking.status = BookingStatus::Completed;
                    booking.completion_date = Some(DateTime::now());
                    completed_now = true;
                }
                _ => booking.status = status,
            }
        }

        self.store.replace_booking(id, booking.clone()).await?;

        if completed_now {
            if let Some(mut plot) = self.store.find_plot(booking.plot).await? {
                let plot_id = booking.plot;
                let colony = plot.colony;
                plot.status = PlotStatus::Sold;
                plot.sold_date = booking.completion_date;
                plot.paid_amount = Some(booking.advance_amount);
                plot.final_price = Some(booking.total_amount);
                self.store.replace_plot(plot_id, plot).await?;
                self.colonies.recount(colony).await?;
            }
        }

        self.get(id).await
    }
}
