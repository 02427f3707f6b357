mod context;
mod session_service;
mod triage_service;

pub use context::TriageContext;
pub use session_service::SessionService;
pub use triage_service::{TriageOutcome, TriageService, TriageSettings};
