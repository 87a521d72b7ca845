//! Opaque token generation
//!
//! Tokens identify invitation links and sessions. They are 32 bytes from the
//! operating system CSPRNG, encoded with the URL-safe base64 alphabet
//! (padded), so every token is 44 characters long.
//!
//! Uniqueness is not checked here. A collision shows up as a uniqueness
//! failure in whichever store persists the token and is reported, never
//! retried.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 32;

/// Generate a new URL-safe opaque token.
///
/// # Examples
///
/// ```
/// use tenancy_auth::generate_token;
///
/// let token = generate_token();
/// assert_eq!(token.len(), 44);
/// assert!(!token.contains('+') && !token.contains('/'));
/// ```
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}
