//! Randomness for keys, errors and the uniform ciphertext halves.

use rand::Rng;
use rand_core::{CryptoRng, RngCore};

use crate::modulus::Modulus;
use crate::params::NOISE_ETA;

const SEED_EXPANSION_CONTEXT: &str = "Murmur v1 pir-uniform-expansion";

/// Seed from which a uniform polynomial is expanded.
pub type Seed = [u8; 32];

pub fn random_seed<R: RngCore + CryptoRng>(rng: &mut R) -> Seed {
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    seed
}

/// Coefficients uniform in `{-1, 0, 1}`.
pub fn ternary<R: RngCore + CryptoRng>(rng: &mut R, modulus: &Modulus, n: usize) -> Vec<u64> {
    (0..n)
        .map(|_| modulus.from_i64(rng.gen_range(-1i64..=1)))
        .collect()
}

/// Centered binomial coefficients in `[-ETA, ETA]`.
pub fn centered_binomial<R: RngCore + CryptoRng>(
    rng: &mut R,
    modulus: &Modulus,
    n: usize,
) -> Vec<u64> {
    let mask = (1u64 << NOISE_ETA) - 1;
    (0..n)
        .map(|_| {
            let r = rng.next_u64();
            let a = (r & mask).count_ones() as i64;
            let b = ((r >> NOISE_ETA) & mask).count_ones() as i64;
            modulus.from_i64(a - b)
        })
        .collect()
}

/// Deterministically expand `seed` into `n` values uniform mod `modulus`.
///
/// The output is used directly as an NTT-form polynomial; the transform is a
/// bijection so uniformity carries over.
pub fn uniform_from_seed(seed: &Seed, modulus: &Modulus, n: usize) -> Vec<u64> {
    let mut hasher = ::blake3::Hasher::new_derive_key(SEED_EXPANSION_CONTEXT);
    hasher.update(seed);
    let mut reader = hasher.finalize_xof();

    let mask = if modulus.bits() == 64 {
        u64::MAX
    } else {
        (1u64 << modulus.bits()) - 1
    };
    let mut out = Vec::with_capacity(n);
    let mut word = [0u8; 8];
    while out.len() < n {
        reader.fill(&mut word);
        let candidate = u64::from_le_bytes(word) & mask;
        if candidate < modulus.value() {
            out.push(candidate);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::CIPHER_MODULUS;
    use rand::rngs::OsRng;

    #[test]
    fn test_uniform_expansion_is_deterministic() {
        let q = Modulus::new(CIPHER_MODULUS).expect("modulus");
        let a = uniform_from_seed(&[9u8; 32], &q, 64);
        let b = uniform_from_seed(&[9u8; 32], &q, 64);
        let c = uniform_from_seed(&[8u8; 32], &q, 64);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().all(|&x| x < CIPHER_MODULUS));
    }

    #[test]
    fn test_noise_is_bounded() {
        let q = Modulus::new(CIPHER_MODULUS).expect("modulus");
        let eta = NOISE_ETA as u64;
        for x in centered_binomial(&mut OsRng, &q, 4096) {
            assert!(x <= eta || x >= CIPHER_MODULUS - eta);
        }
        for x in ternary(&mut OsRng, &q, 4096) {
            assert!(x <= 1 || x == CIPHER_MODULUS - 1);
        }
    }
}
