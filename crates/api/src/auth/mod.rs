//! Credentials and tokens.
//!
//! - [`password`]: Argon2id hashing and the password policy for new accounts.
//! - [`jwt`]: signed access tokens and opaque refresh tokens.

pub mod jwt;
pub mod password;
