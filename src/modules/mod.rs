//! Modules layer - Infrastructure collaborators
//!
//! Persistence, the triage decision model and outbound email.

pub mod decision;
pub mod mailer;
pub mod store;
