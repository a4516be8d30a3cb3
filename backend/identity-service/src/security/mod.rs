/// Security primitives for identity-service
///
/// - **password**: Argon2id credential hashing with configurable cost
/// - **reset_code**: one-time password reset codes and their stored digests
pub mod password;
pub mod reset_code;

pub use password::CredentialHasher;
pub use reset_code::{digest_code, generate_code, RESET_CODE_LENGTH};
