/// Number of digits in a one-time authentication code
pub const OTP_LENGTH: usize = 6;

/// Prior triage summaries are cut to this many characters in the context
pub const MAX_PRIOR_SUMMARY_CHARS: usize = 280;

/// Offset between the patient message and the paired reply timestamp
pub const REPLY_TIMESTAMP_STEP_MS: i64 = 1;

// =============================================================================
// MESSAGE ROLES (decision collaborator wire names)
// =============================================================================

/// Role name the decision model uses for patient turns
pub const LLM_ROLE_USER: &str = "user";

/// Role name the decision model uses for its own turns
pub const LLM_ROLE_MODEL: &str = "model";
