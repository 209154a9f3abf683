//! Worker token verification.

/// Compares a presented token with the configured secret.
///
/// Runs in time independent of where the first mismatching byte is. A
/// length mismatch returns early; the secret's length is not treated as
/// confidential.
#[must_use]
pub fn token_matches(presented: &str, secret: &str) -> bool {
    let presented = presented.as_bytes();
    let secret = secret.as_bytes();
    if presented.len() != secret.len() {
        return false;
    }
    let diff = presented
        .iter()
        .zip(secret)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));
    std::hint::black_box(diff) == 0
}
