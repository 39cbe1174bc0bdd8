pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod logging;
pub mod rpc;
pub mod shutdown;
