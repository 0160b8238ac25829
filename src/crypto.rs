use rand::Rng;

/// Length of generated session identifiers in characters.
pub const SESSION_ID_LENGTH: usize = 32;

/// Upper bound on identifier length accepted from cookies or config.
pub const MAX_SESSION_ID_LENGTH: usize = 256;

/// Generates a random alphanumeric token of the given length.
///
/// # Example
///
/// ```rust
/// use inn_session::crypto::generate_token;
///
/// let token = generate_token(32);
/// assert_eq!(token.len(), 32);
/// ```
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

/// Generates a fresh session identifier.
pub fn generate_session_id() -> String {
    generate_token(SESSION_ID_LENGTH)
}

/// Returns true if `id` only uses `[A-Za-z0-9,-]` and is 1..=256 chars long.
///
/// Identifiers become file names in [`FileSessionRepository`](crate::FileSessionRepository),
/// so nothing else is allowed through.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ',' || c == '-')
}

/// Constant-time comparison to prevent timing attacks.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
