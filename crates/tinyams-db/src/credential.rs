//! Password hashing for stored credentials.
//!
//! Argon2id with OWASP-recommended parameters (memory: 19 MiB,
//! iterations: 2, parallelism: 1). Salt is random per hash. An optional
//! pepper (server-side secret) is prepended to the password.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};

use crate::error::DbError;

pub(crate) fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, DbError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| DbError::Credential(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| DbError::Credential(e.to_string()))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_argon2id_phc_string() {
        let hash = hash_password("pw1", None).unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=19456,t=2,p=1$"));
    }

    #[test]
    fn salts_differ_between_calls() {
        let a = hash_password("pw1", None).unwrap();
        let b = hash_password("pw1", None).unwrap();
        assert_ne!(a, b);
    }
}
