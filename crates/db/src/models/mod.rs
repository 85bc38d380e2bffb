//! Row types and DTOs, one module per table.

pub mod audit;
pub mod center;
pub mod committee;
pub mod geo_unit;
pub mod session;
pub mod user;
