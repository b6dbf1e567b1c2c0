use crate::Generator;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use snip_core::ShortCode;

/// Width of every generated code.
pub const CODE_LENGTH: usize = 8;

/// Derives codes from the SHA-256 digest of the input.
///
/// The 32-byte digest is encoded with the URL-safe base64 alphabet
/// (`A-Z a-z 0-9 - _`) and truncated to [`CODE_LENGTH`] characters, giving
/// 48 bits of code space.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestGenerator;

impl DigestGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for DigestGenerator {
    type Output = ShortCode;

    fn generate(&self, input: &str) -> ShortCode {
        let digest = Sha256::digest(input.as_bytes());
        let mut encoded = URL_SAFE.encode(digest);
        // 32 bytes encode to 44 characters; the first 8 never contain padding.
        encoded.truncate(CODE_LENGTH);
        ShortCode::new_unchecked(encoded)
    }
}
