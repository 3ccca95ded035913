//! Domain types shared across the scheduler, resilience layer, and stores.

pub mod history;
pub mod identity;
pub mod item;
pub mod search;

pub use history::{BidPoint, PricePoint};
pub use identity::ClientIdentity;
pub use item::{Item, ItemStatus, Listing};
pub use search::{ExecutionStatus, Search, SearchExecution};
