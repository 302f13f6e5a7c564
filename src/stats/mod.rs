//! Persisted win/lose counters and preferences.

mod record;
mod store;

pub use record::*;
pub use store::*;
