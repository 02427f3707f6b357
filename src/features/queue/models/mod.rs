mod ticket;

pub use ticket::{next_ticket_number, Ticket, TicketIssue};
