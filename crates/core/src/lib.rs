//! Domain logic for the pollsite admin service.
//!
//! Nothing in this crate touches the database directly. Storage is reached
//! through the lookup and store traits in [`geo_chain`] and [`backup::store`],
//! which the `pollsite-db` crate implements on top of PostgreSQL.

pub mod audit;
pub mod backup;
pub mod error;
pub mod flag;
pub mod geo;
pub mod geo_chain;
pub mod geo_upload;
pub mod roles;
pub mod types;
