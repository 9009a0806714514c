//! External API integrations

pub mod print_server;

pub use print_server::PrintServerClient;
