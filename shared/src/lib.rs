//! Shopfront Shared Library
//!
//! Wire types, models and validation helpers shared by the backend and
//! anything that talks to it.

pub mod models;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use models::{Role, User};
pub use types::*;
