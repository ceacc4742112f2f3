//! Paper data model
//!
//! Typed records decoded at the store boundary so the rest of the
//! system never handles raw upstream payloads.

mod citation;
mod paper;

pub use citation::{CitationEdge, Direction, EdgeFilter};
pub use paper::{PaperId, PaperRecord};
