//! HTTP handlers, one module per resource.

pub mod admin;
pub mod audit;
pub mod auth;
pub mod backup;
pub mod centers;
pub mod committees;
pub mod geo;
