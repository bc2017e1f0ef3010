//! Request handlers.

pub mod admin;
pub mod auth;
pub mod uploads;
pub mod users;
pub mod videos;
