//! Shared types and models for the Delivery Hub platform
//!
//! This crate contains the order lifecycle, pricing and validation rules shared
//! between the backend, the storefront (via WASM), and other components of the
//! system.

pub mod models;
pub mod pricing;
pub mod types;
pub mod validation;

pub use models::*;
pub use pricing::*;
pub use types::*;
pub use validation::*;
