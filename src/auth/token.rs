use rand::{rngs::OsRng, RngCore};

pub const VERIFICATION_TOKEN_BYTES: usize = 32;

/// 32 bytes from the OS CSPRNG, hex encoded (64 chars).
pub fn generate_verification_token() -> String {
    let mut buf = [0u8; VERIFICATION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

pub fn token_matches(provided: &str, stored: Option<&str>) -> bool {
    matches!(stored, Some(stored) if stored == provided)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_64_lowercase_hex_chars() {
        let token = generate_verification_token();
        assert_eq!(token.len(), VERIFICATION_TOKEN_BYTES * 2);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let a = generate_verification_token();
        let b = generate_verification_token();
        assert_ne!(a, b);
    }

    #[test]
    fn match_requires_exact_stored_value() {
        let token = generate_verification_token();
        assert!(token_matches(&token, Some(&token)));
        assert!(!token_matches(&token.to_uppercase(), Some(&token)));
        assert!(!token_matches(&token, None));
        assert!(!token_matches("", Some(&token)));
    }
}
