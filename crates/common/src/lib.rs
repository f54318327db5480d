//! Common types, protocol definitions, and errors shared across the order service crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
