use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

/// 32 bytes = 256 bits of entropy per token.
pub const TOKEN_BYTES: usize = 32;

/// Mint an opaque bearer token from the OS CSPRNG, URL-safe base64 without padding.
///
/// Uniqueness is not checked against the store; collisions are negligible at this size.
pub fn generate_token() -> String {
    let mut buffer = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
