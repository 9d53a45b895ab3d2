pub mod config;
pub mod error;
pub mod identity;
pub mod roster;
pub mod server;
