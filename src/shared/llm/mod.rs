//! Parsing of structured (JSON) output produced by text-completion models.

mod parser;
mod response;

pub use parser::parse_with_fallback;
pub use response::LlmResponse;
