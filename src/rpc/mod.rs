//! Remote interface of the authentication service: wire types, the endpoint
//! that serves them, and the clients that call it.

pub mod client;
pub mod proto;
pub mod server;

pub use client::{AuthClient, HttpAuthClient, LocalAuthClient};
pub use server::create_router;

pub const REGISTER_PATH: &str = "/rpc/auth/register";
pub const LOGIN_PATH: &str = "/rpc/auth/login";
pub const VALIDATE_TOKEN_PATH: &str = "/rpc/auth/validate-token";
pub const LOGOUT_PATH: &str = "/rpc/auth/logout";
pub const GET_USER_PATH: &str = "/rpc/auth/get-user";
