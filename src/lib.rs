pub mod auth;
pub mod commands;
pub mod http;
pub mod runtime;
pub mod store;
pub mod users;
