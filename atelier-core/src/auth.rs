//! Password digests for the USERS table.
//!
//! Stored passwords are the lower-case hex SHA-256 of the UTF-8 password, with no
//! salt. That matches the existing seeded data; it is not a recommendation.

use sha2::{Digest, Sha256};

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password).eq_ignore_ascii_case(stored_hash.trim())
}
