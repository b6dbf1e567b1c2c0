pub mod digest;

pub use digest::DigestGenerator;

use snip_core::ShortCode;

/// Trait for deriving short codes from input strings.
///
/// Implementations are pure generators that don't interact with storage:
/// the same input must always produce the same code. The allocator relies
/// on this to walk a deterministic re-hash chain on collisions.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Derives a code from `input`. Must not panic for any string, including `""`.
    fn generate(&self, input: &str) -> Self::Output;
}
