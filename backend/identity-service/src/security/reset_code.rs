/// One-time password reset codes
///
/// The raw code only ever travels in the reset email. Storage and lookup use
/// its SHA-256 digest, so a leaked table cannot be replayed.
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

/// Code length (before hashing)
pub const RESET_CODE_LENGTH: usize = 32;

/// Generate a secure random reset code from the OS CSPRNG
pub fn generate_code() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(RESET_CODE_LENGTH)
        .map(char::from)
        .collect()
}

/// Storage key for a reset code
pub fn digest_code(code: &str) -> String {
    crypto_core::hash::sha256_hex(code)
}
