//! Worker runtime and batch scheduling

pub mod runtime;
pub mod scheduler;

pub use runtime::*;
pub use scheduler::*;
