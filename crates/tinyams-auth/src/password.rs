//! Association password checks against stored Argon2id hashes.

use std::borrow::Cow;

use argon2::{Argon2, PasswordHash, PasswordVerifier};

use crate::error::AuthError;

/// The bytes actually fed to Argon2: `pepper ++ password`.
fn peppered<'a>(password: &'a str, pepper: Option<&str>) -> Cow<'a, str> {
    match pepper {
        Some(p) => Cow::Owned(format!("{p}{password}")),
        None => Cow::Borrowed(password),
    }
}

/// Check `password` against a PHC-format hash.
///
/// A mismatch is [`AuthError::InvalidCredentials`]. A hash that cannot be
/// parsed is a [`AuthError::Crypto`] fault, never a login failure.
pub fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("stored hash is malformed: {e}")))?;

    // Parameters come from the PHC string, so the default instance is fine.
    match Argon2::default().verify_password(peppered(password, pepper).as_bytes(), &parsed) {
        Ok(()) => Ok(()),
        Err(argon2::password_hash::Error::Password) => Err(AuthError::InvalidCredentials),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::PasswordHasher;
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;

    fn stored(password: &str, pepper: Option<&str>) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(peppered(password, pepper).as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn matching_password_passes() {
        let hash = stored("pw1", None);
        assert!(verify_password("pw1", &hash, None).is_ok());
    }

    #[test]
    fn wrong_password_is_invalid_credentials() {
        let hash = stored("pw1", None);
        assert!(matches!(
            verify_password("pw2", &hash, None),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("", &hash, None),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn pepper_must_match() {
        let hash = stored("pw1", Some("s3cret"));
        assert!(verify_password("pw1", &hash, Some("s3cret")).is_ok());
        assert!(verify_password("pw1", &hash, None).is_err());
        assert!(verify_password("pw1", &hash, Some("other")).is_err());
    }

    #[test]
    fn malformed_hash_is_a_fault() {
        assert!(matches!(
            verify_password("pw1", "not-a-hash", None),
            Err(AuthError::Crypto(_))
        ));
    }
}
