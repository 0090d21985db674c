//! Shared data models spanning the engine layers.

pub mod alert;
pub mod destination;
pub mod snapshot;
pub mod user;

pub use alert::{AlertFrequency, AlertPreference};
pub use destination::Destination;
pub use snapshot::{CrimeSnapshot, PriceSnapshot, SignalType, Snapshot, WeatherSnapshot};
pub use user::User;
