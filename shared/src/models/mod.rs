//! Domain models for the Delivery Hub platform

mod addon;
mod catalog;
mod customer;
mod establishment;
mod finance;
mod order;
mod staff;
mod subscription;
mod table;

pub use addon::*;
pub use catalog::*;
pub use customer::*;
pub use establishment::*;
pub use finance::*;
pub use order::*;
pub use staff::*;
pub use subscription::*;
pub use table::*;
