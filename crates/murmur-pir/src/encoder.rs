//! Batch encoding: `N` values mod `T` packed into one plaintext polynomial
//! so that ring products act slot-wise.
//!
//! Slots form a 2 x `ROW_SIZE` matrix. Slot `(0, i)` is the evaluation at
//! `zeta^(3^i)` and slot `(1, i)` at `zeta^(-3^i)`, so the automorphism
//! `X -> X^3` rotates both rows left by one and `X -> X^(2N-1)` swaps them.

use crate::modulus::Modulus;
use crate::ntt::{GaloisTables, NttTables};
use crate::params::{PLAIN_MODULUS, POLY_DEGREE, ROW_GENERATOR, ROW_SIZE};
use crate::{PirError, Result};

pub struct BatchEncoder {
    tables: NttTables,
    /// Slot index (row-major) to NTT position.
    slot_to_position: Vec<usize>,
}

impl BatchEncoder {
    pub fn new() -> Result<Self> {
        let tables = NttTables::new(Modulus::new(PLAIN_MODULUS)?, POLY_DEGREE)?;
        let galois = GaloisTables::new(&tables)?;
        let two_n = 2 * POLY_DEGREE;

        let mut slot_to_position = vec![0usize; POLY_DEGREE];
        let mut power = 1usize;
        for i in 0..ROW_SIZE {
            slot_to_position[i] = galois.index_of(power);
            slot_to_position[ROW_SIZE + i] = galois.index_of(two_n - power);
            power = (power * ROW_GENERATOR) % two_n;
        }

        Ok(Self {
            tables,
            slot_to_position,
        })
    }

    pub fn plain_modulus(&self) -> &Modulus {
        self.tables.modulus()
    }

    /// Encode `POLY_DEGREE` slot values (each `< T`) into coefficients mod `T`.
    pub fn encode(&self, slots: &[u64]) -> Result<Vec<u64>> {
        if slots.len() != POLY_DEGREE {
            return Err(PirError::Parameters(format!(
                "expected {POLY_DEGREE} slots, got {}",
                slots.len()
            )));
        }
        let t = self.plain_modulus();
        let mut evaluations = vec![0u64; POLY_DEGREE];
        for (&pos, &value) in self.slot_to_position.iter().zip(slots) {
            evaluations[pos] = t.reduce(value);
        }
        self.tables.inverse(&mut evaluations);
        Ok(evaluations)
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn decode(&self, coefficients: &[u64]) -> Vec<u64> {
        let mut evaluations = coefficients.to_vec();
        self.tables.forward(&mut evaluations);
        self.slot_to_position
            .iter()
            .map(|&pos| evaluations[pos])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntt::apply_permutation;
    use crate::params::{GALOIS_ROTATE_RIGHT, GALOIS_ROW_SWAP};

    fn sample_slots() -> Vec<u64> {
        (0..POLY_DEGREE as u64).map(|i| (i * 7919 + 3) % PLAIN_MODULUS).collect()
    }

    /// Apply `X -> X^g` through the plaintext NTT.
    fn automorphism(encoder: &BatchEncoder, coeffs: &[u64], g: usize) -> Vec<u64> {
        let galois = GaloisTables::new(&encoder.tables).expect("galois");
        let mut evals = coeffs.to_vec();
        encoder.tables.forward(&mut evals);
        let mut out = apply_permutation(&evals, &galois.permutation(g));
        encoder.tables.inverse(&mut out);
        out
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let encoder = BatchEncoder::new().expect("encoder");
        let slots = sample_slots();
        let coeffs = encoder.encode(&slots).expect("encode");
        assert_eq!(encoder.decode(&coeffs), slots);
    }

    #[test]
    fn test_products_are_slotwise() {
        let encoder = BatchEncoder::new().expect("encoder");
        let t = *encoder.plain_modulus();
        let a = sample_slots();
        let b: Vec<u64> = a.iter().map(|x| (x * 31 + 5) % PLAIN_MODULUS).collect();

        let mut fa = encoder.encode(&a).expect("encode");
        let mut fb = encoder.encode(&b).expect("encode");
        encoder.tables.forward(&mut fa);
        encoder.tables.forward(&mut fb);
        let mut prod: Vec<u64> = fa.iter().zip(&fb).map(|(&x, &y)| t.mul(x, y)).collect();
        encoder.tables.inverse(&mut prod);

        let expected: Vec<u64> = a.iter().zip(&b).map(|(&x, &y)| t.mul(x, y)).collect();
        assert_eq!(encoder.decode(&prod), expected);
    }

    #[test]
    fn test_rotate_right_and_row_swap() {
        let encoder = BatchEncoder::new().expect("encoder");
        let slots = sample_slots();
        let coeffs = encoder.encode(&slots).expect("encode");

        let rotated = encoder.decode(&automorphism(&encoder, &coeffs, GALOIS_ROTATE_RIGHT));
        for row in 0..2 {
            for i in 0..ROW_SIZE {
                let from = row * ROW_SIZE + (i + ROW_SIZE - 1) % ROW_SIZE;
                assert_eq!(rotated[row * ROW_SIZE + i], slots[from]);
            }
        }

        let swapped = encoder.decode(&automorphism(&encoder, &coeffs, GALOIS_ROW_SWAP));
        assert_eq!(&swapped[..ROW_SIZE], &slots[ROW_SIZE..]);
        assert_eq!(&swapped[ROW_SIZE..], &slots[..ROW_SIZE]);
    }
}
