//! Business logic services for the Delivery Hub platform

pub mod addon;
pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod customer;
pub mod dashboard;
pub mod establishment;
pub mod finance;
pub mod order;
pub mod printing;
pub mod realtime;
pub mod staff;
pub mod subscription;
pub mod table;

pub use addon::AddonService;
pub use auth::AuthService;
pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use customer::CustomerService;
pub use dashboard::DashboardService;
pub use establishment::EstablishmentService;
pub use finance::FinanceService;
pub use order::OrderService;
pub use printing::PrintingService;
pub use realtime::RealtimeHub;
pub use staff::StaffService;
pub use subscription::SubscriptionService;
pub use table::TableService;
