//! Seeded pseudo-random stream used wherever a result must be replayable.
//!
//! Board layouts and per-landing question picks must come out identical for
//! the same seed, on every platform and in every run. `Mulberry32` is a tiny
//! 32-bit mixing generator with exactly that property: the whole state is
//! one `u32`, and every step is wrapping integer arithmetic.
//!
//! It also implements [`rand::RngCore`], so it can be handed to anything in
//! the engine that takes a generic `rand::Rng` (dice, shuffles) when a test
//! wants a reproducible run.

use rand::RngCore;

/// Mulberry32 generator.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    /// Creates a generator positioned at the start of `seed`'s stream.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Advances the stream and returns the next raw 32-bit output.
    pub fn step(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Returns a float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.step()) / 4_294_967_296.0
    }

    /// Returns an index in `0..n`. `n` must be non-zero.
    pub fn below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "below() needs a non-empty range");
        ((self.next_f64() * n as f64) as usize).min(n.saturating_sub(1))
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.step()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.step());
        let lo = u64::from(self.step());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
