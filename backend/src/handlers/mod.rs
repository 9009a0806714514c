//! HTTP request handlers

pub mod addon;
pub mod auth;
pub mod catalog;
pub mod customer;
pub mod dashboard;
pub mod establishment;
pub mod finance;
pub mod health;
pub mod order;
pub mod printing;
pub mod realtime;
pub mod staff;
pub mod storefront;
pub mod subscription;
pub mod table;

pub use addon::*;
pub use auth::*;
pub use catalog::*;
pub use customer::*;
pub use dashboard::*;
pub use establishment::*;
pub use finance::*;
pub use health::*;
pub use order::*;
pub use printing::*;
pub use realtime::*;
pub use staff::*;
pub use storefront::*;
pub use subscription::*;
pub use table::*;
