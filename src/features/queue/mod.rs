//! Per-doctor, per-day queue tickets.
//!
//! Ticket numbers start at 1 for each doctor on each local calendar day and
//! are issued under an exclusive section keyed by `(doctor, day)`.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;

pub use services::TicketSequencer;
