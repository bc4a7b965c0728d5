//! Shared cryptographic helpers for Inkwell services
//!
//! - `hash`: SHA-256 digests for tokens and one-time codes
//! - `password`: Argon2id password hashing
//! - `token`: random session tokens and numeric one-time codes

pub mod hash;
pub mod password;
pub mod token;

pub use hash::{sha256, sha256_hex};
pub use password::{hash_password, verify_password};
pub use token::{generate_numeric_code, generate_token};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("invalid password hash: {0}")]
    InvalidHash(String),
}
