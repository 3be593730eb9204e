use std::num::NonZeroU32;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const OUTPUT_LEN: usize = 32;

/// Iterations applied when hashing a new password.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Length of the random per-user salt.
pub const SALT_LEN: usize = 64;

/// Derive the stored password hash.
///
/// PBKDF2-HMAC-SHA256 with a random per-user salt; the iteration count is
/// persisted next to the hash so it can be raised later without invalidating
/// existing accounts.
pub fn hash_password(password: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut out = vec![0u8; OUTPUT_LEN];
    let iterations = NonZeroU32::new(iterations).expect("Iterations must be non-zero");
    pbkdf2_hmac::<Sha256>(password, salt, iterations.get(), &mut out);
    out
}

pub fn verify_password(password: &[u8], salt: &[u8], expected: &[u8], iterations: u32) -> bool {
    let iterations = NonZeroU32::new(iterations).expect("Iterations must be non-zero");
    if expected.len() != OUTPUT_LEN {
        return false;
    }

    // Derive and constant-time compare.
    let mut out = vec![0u8; OUTPUT_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations.get(), &mut out);
    subtle::ConstantTimeEq::ct_eq(out.as_ref(), expected).into()
}
