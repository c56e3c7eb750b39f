use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};

/// Number of random bytes behind every opaque token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generates an opaque, URL-safe token from the operating system RNG.
///
/// The bytes are encoded as unpadded base64url, so a 32-byte token is 43
/// characters long and can be dropped into a query string as-is.
///
/// # Examples
///
/// ```ignore
/// let token = generate_url_safe_token(32);
/// assert_eq!(token.len(), 43);
/// ```
pub fn generate_url_safe_token(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_full_length() {
        let token = generate_url_safe_token(TOKEN_BYTES);
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn tokens_do_not_repeat() {
        let first = generate_url_safe_token(TOKEN_BYTES);
        let second = generate_url_safe_token(TOKEN_BYTES);
        assert_ne!(first, second);
    }
}
