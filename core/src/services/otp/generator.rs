//! Cryptographically secure code generation

use rand::{rngs::OsRng, Rng};

/// Number of digits in a code
pub const CODE_LENGTH: usize = 6;

const MIN_CODE: u32 = 100_000;
const MAX_CODE: u32 = 999_999;

/// Source of one-time codes
pub trait CodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform 6-digit codes from the OS CSPRNG.
///
/// The range starts at 100000, so codes never carry a leading zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecureCodeGenerator;

impl CodeGenerator for SecureCodeGenerator {
    fn generate(&self) -> String {
        OsRng.gen_range(MIN_CODE..=MAX_CODE).to_string()
    }
}
