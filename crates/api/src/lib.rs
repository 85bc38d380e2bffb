//! Pollsite API server library.
//!
//! Exposes config, state, error handling and the router so integration tests
//! and the binary entrypoint build the same application.

pub mod audit_trail;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod upload;
