//! Data models
//!
//! Shared between the data access layer and the backend API.
//! All identifiers are strings assigned by whichever source creates
//! the entity (backend in remote mode, entity store in fallback mode).

mod customer;
mod dining_table;
mod order;

pub use customer::*;
pub use dining_table::*;
pub use order::*;
