mod message;
mod session;

pub use message::{stamp_after, Message, MessageRole, NewMessage};
pub use session::{Session, SessionDetail, SessionState, Vitals};
