//! Persistent storage for destinations, snapshots, and alert preferences

pub mod postgres;

pub use postgres::{DestinationRanked, TravelStore};
