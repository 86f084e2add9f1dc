//! plotledger - colony and plot management backend
//!
//! REST backend for a land-colony business: colonies subdivided into
//! properties and plots, bookings reconciled against the plot lifecycle,
//! role-based users, and a company settings registry of land owners.
//!
//! ## Core rules
//!
//! - Plot numbers are sequential per colony (PLOT-0001, ...), booking numbers
//!   global (BK000001, ...), user codes per role prefix (AG-00001, ...)
//! - A plot has at most one open booking; writes that land a plot in a booked
//!   or sold status are reconciled against the booking ledger
//! - Colony plot counts are a cache, rebuilt by full rescan after every
//!   plot write

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod services;
pub mod store;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{LedgerError, Result};
