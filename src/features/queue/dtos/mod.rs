mod queue_dto;

pub use queue_dto::{QueueStatusDto, TicketDto};
