//! Session token generation.

use rand::RngCore;

/// Raw entropy per token. 32 bytes is 256 bits, comfortably past the
/// 128-bit floor required for bearer credentials.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Generates an opaque session token as lowercase hex.
///
/// Uniqueness is probabilistic here and enforced by the sessions table's
/// primary key; a collision surfaces as a conflict, never as a silent
/// overwrite.
pub fn generate_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::{generate_token, SESSION_TOKEN_BYTES};
    use std::collections::HashSet;

    #[test]
    fn tokens_are_fixed_width_lowercase_hex() {
        let token = generate_token();
        assert_eq!(token.len(), SESSION_TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..64).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 64);
    }
}
