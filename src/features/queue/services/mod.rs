mod ticket_sequencer;

pub use ticket_sequencer::{QueueStatus, TicketSequencer};
