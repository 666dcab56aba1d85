use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{rngs::OsRng, seq::SliceRandom, Rng};
use sha2::{Digest, Sha256};
use tracing::error;

use crate::error::AppError;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            AppError::Internal
        })
}

/// `Ok(false)` on mismatch; an unparseable stored hash is an internal error.
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Stored password hash is malformed: {}", e);
        AppError::Internal
    })?;

    Ok(Argon2::default().verify_password(plain.as_bytes(), &parsed).is_ok())
}

/// 64 hex characters of OS randomness.
pub fn generate_reset_token() -> String {
    let bytes: [u8; 32] = OsRng.gen();
    hex::encode(bytes)
}

pub fn digest_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// 12 characters with at least one upper, lower, digit and symbol.
pub fn generate_temp_password() -> String {
    let mut rng = rand::thread_rng();
    let classes = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS];
    let charset: Vec<u8> = classes.concat();

    let mut chars: Vec<u8> = classes
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while chars.len() < 12 {
        chars.push(charset[rng.gen_range(0..charset.len())]);
    }
    chars.shuffle(&mut rng);

    chars.into_iter().map(char::from).collect()
}
