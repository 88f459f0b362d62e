//! Data models for the War Thunder catalog.
//!
//! Catalog records keep the stored (Spanish) field names of the scraped documents;
//! moderation and actor models use camelCase on the wire.

mod actor;
mod pending;
mod tank;

pub use actor::*;
pub use pending::*;
pub use tank::*;
