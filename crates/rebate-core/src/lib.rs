//! # rebate-core
//!
//! Core types, traits, and abstractions for the rebate OAuth2 token lifecycle.
//!
//! This crate provides the entities, storage traits, clock, and error type
//! that the other rebate crates depend on.

pub mod clock;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
pub use uuid_utils::{extract_timestamp, new_jti, new_v7};
