//! Environment abstraction for deterministic testing.
//!
//! Decouples the session from the system entropy source so tests can run
//! against a seeded RNG while production pulls from the OS.

use rand_core::{CryptoRng, RngCore};

/// Abstract source of cryptographic randomness.
///
/// Implementations MUST use cryptographically secure entropy in production.
/// Test environments may be seeded, in which case the same seed produces the
/// same byte sequence.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);
}

/// Production environment backed by the operating system's entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEnvironment;

impl Environment for OsEnvironment {
    fn random_bytes(&self, buffer: &mut [u8]) {
        let Ok(()) = getrandom::fill(buffer) else {
            unreachable!("OS entropy source is unavailable");
        };
    }
}

/// Adapter exposing an [`Environment`] as an [`RngCore`] so the crypto layer
/// can sample from it directly.
pub(crate) struct EnvRng<'a, E: Environment>(pub(crate) &'a E);

impl<E: Environment> RngCore for EnvRng<'_, E> {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.random_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.0.random_bytes(dest);
        Ok(())
    }
}

// The Environment contract requires secure entropy.
impl<E: Environment> CryptoRng for EnvRng<'_, E> {}
