//! Configuration components
//!
//! One small struct per concern, each with its own defaults and validation.

pub mod history;
pub mod logging;
pub mod store;

pub use history::*;
pub use logging::*;
pub use store::*;
