/// Password hashing and verification using Argon2id
use crate::CryptoError;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password using Argon2id with a random 16-byte salt.
///
/// Returns a PHC-formatted string safe for database storage. Strength rules
/// are the caller's concern.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CryptoError::Hashing(e.to_string()))
}

/// Verify a password against its PHC hash.
///
/// `Ok(false)` means the password does not match; `Err` means the stored
/// hash itself is unusable.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, CryptoError> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| CryptoError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CryptoError::InvalidHash(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_valid_password() {
        let password = "correct horse 42";
        let hash = hash_password(password).expect("should hash password successfully");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(password, &hash).expect("should verify successfully"));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("correct horse 42").expect("should hash password successfully");
        assert!(!verify_password("wrong horse 42", &hash).expect("verification should succeed"));
    }

    #[test]
    fn test_verify_garbage_hash_is_error() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(CryptoError::InvalidHash(_))
        ));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let hash1 = hash_password("same password 1").expect("should hash successfully");
        let hash2 = hash_password("same password 1").expect("should hash successfully");
        // Different salts should produce different hashes
        assert_ne!(hash1, hash2);
    }
}
