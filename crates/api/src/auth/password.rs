//! Argon2id password hashing and the account password policy.
//!
//! Hashes are stored in PHC string form, so the salt and parameters travel
//! with the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use pollsite_core::error::CoreError;

/// Shortest password accepted for a new account.
pub const MIN_PASSWORD_LENGTH: usize = 10;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check `password` against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; only a malformed hash is an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Enforce the password policy: at least [`MIN_PASSWORD_LENGTH`] characters,
/// with at least one letter and one digit.
pub fn check_password_policy(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(CoreError::Validation(
            "Password must contain both letters and digits".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("ballot-box-2024").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("ballot-box-2024", &hash).unwrap());
        assert!(!verify_password("ballot-box-2025", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn policy_rejects_short_and_single_class_passwords() {
        assert_matches!(check_password_policy("abc123"), Err(CoreError::Validation(_)));
        assert_matches!(
            check_password_policy("onlyletterspassword"),
            Err(CoreError::Validation(msg)) if msg.contains("digits")
        );
        assert_matches!(check_password_policy("1234567890123"), Err(CoreError::Validation(_)));
        assert!(check_password_policy("precinct42north").is_ok());
    }
}
