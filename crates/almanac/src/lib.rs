//! Durable record of verification runs, one entry per service.
//!
//! The whole [`Almanac`] is held in memory and rewritten to its backing
//! store on every [`AlmanacStore::record_run`].

mod backing;
mod error;
mod record;
mod store;

pub use backing::Backing;
pub use error::AlmanacError;
pub use record::{Almanac, ServiceRecord};
pub use store::AlmanacStore;
