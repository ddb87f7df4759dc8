pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod password;
pub mod server;
pub mod store;
