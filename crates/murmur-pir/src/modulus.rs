//! Word-sized modular arithmetic.
//!
//! Products use Barrett reduction. NTT twiddles use Shoup's precomputed
//! quotients, which turn a modular multiply by a fixed constant into two
//! word multiplies and one correction.

use crate::{PirError, Result};

/// A prime modulus below `2^62` with its Barrett constant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Modulus {
    value: u64,
    bits: u32,
    /// `floor(2^(2·bits) / value)`.
    barrett: u128,
}

impl Modulus {
    pub fn new(value: u64) -> Result<Self> {
        if !(2..(1u64 << 62)).contains(&value) {
            return Err(PirError::Parameters(format!(
                "modulus {value} outside [2, 2^62)"
            )));
        }
        let bits = 64 - value.leading_zeros();
        Ok(Self {
            value,
            bits,
            barrett: (1u128 << (2 * bits)) / value as u128,
        })
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Reduce `x < 2^(2·bits)`.
    #[inline]
    pub fn reduce_u128(&self, x: u128) -> u64 {
        let q1 = x >> (self.bits - 1);
        let q3 = (q1 * self.barrett) >> (self.bits + 1);
        let mut r = (x - q3 * self.value as u128) as u64;
        while r >= self.value {
            r -= self.value;
        }
        r
    }

    #[inline]
    pub fn reduce(&self, x: u64) -> u64 {
        x % self.value
    }

    #[inline]
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        self.reduce_u128(a as u128 * b as u128)
    }

    #[inline]
    pub fn add(&self, a: u64, b: u64) -> u64 {
        let s = a + b;
        if s >= self.value {
            s - self.value
        } else {
            s
        }
    }

    #[inline]
    pub fn sub(&self, a: u64, b: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            a + self.value - b
        }
    }

    #[inline]
    pub fn neg(&self, a: u64) -> u64 {
        if a == 0 {
            0
        } else {
            self.value - a
        }
    }

    /// Map a small signed integer into `[0, value)`.
    #[inline]
    pub fn from_i64(&self, x: i64) -> u64 {
        let r = x.rem_euclid(self.value as i64);
        r as u64
    }

    pub fn pow(&self, base: u64, mut exp: u64) -> u64 {
        let mut result = 1 % self.value;
        let mut base = self.reduce(base);
        while exp > 0 {
            if exp & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            exp >>= 1;
        }
        result
    }

    /// Inverse by Fermat. The modulus is prime.
    pub fn inv(&self, a: u64) -> Option<u64> {
        let a = self.reduce(a);
        (a != 0).then(|| self.pow(a, self.value - 2))
    }

    /// Shoup quotient `floor(w · 2^64 / value)` for a fixed multiplicand `w`.
    #[inline]
    pub fn shoup(&self, w: u64) -> u64 {
        (((w as u128) << 64) / self.value as u128) as u64
    }

    /// `a · w mod value` given `w_shoup = self.shoup(w)`.
    #[inline]
    pub fn mul_shoup(&self, a: u64, w: u64, w_shoup: u64) -> u64 {
        let hi = ((a as u128 * w_shoup as u128) >> 64) as u64;
        let r = a.wrapping_mul(w).wrapping_sub(hi.wrapping_mul(self.value));
        if r >= self.value {
            r - self.value
        } else {
            r
        }
    }

    /// A primitive `order`-th root of unity, for `order` a power of two
    /// dividing `value - 1`.
    pub fn primitive_root_of_unity(&self, order: u64) -> Result<u64> {
        if !order.is_power_of_two() || order < 2 || (self.value - 1) % order != 0 {
            return Err(PirError::Parameters(format!(
                "no root of order {order} modulo {}",
                self.value
            )));
        }
        let cofactor = (self.value - 1) / order;
        (2..1000u64)
            .map(|g| self.pow(g, cofactor))
            .find(|&w| self.pow(w, order / 2) == self.value - 1)
            .ok_or_else(|| {
                PirError::Parameters(format!("no generator found modulo {}", self.value))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CIPHER_MODULUS, PLAIN_MODULUS, POLY_DEGREE};

    fn is_prime(n: u64) -> bool {
        if n < 2 {
            return false;
        }
        let small = [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
        if small.contains(&n) {
            return true;
        }
        if small.iter().any(|p| n % p == 0) {
            return false;
        }
        let mulmod = |a: u64, b: u64| ((a as u128 * b as u128) % n as u128) as u64;
        let powmod = |mut b: u64, mut e: u64| {
            let mut r = 1u64;
            while e > 0 {
                if e & 1 == 1 {
                    r = mulmod(r, b);
                }
                b = mulmod(b, b);
                e >>= 1;
            }
            r
        };
        let mut d = n - 1;
        let mut s = 0;
        while d % 2 == 0 {
            d /= 2;
            s += 1;
        }
        'witness: for a in small {
            let mut x = powmod(a, d);
            if x == 1 || x == n - 1 {
                continue;
            }
            for _ in 1..s {
                x = mulmod(x, x);
                if x == n - 1 {
                    continue 'witness;
                }
            }
            return false;
        }
        true
    }

    #[test]
    fn test_moduli_are_prime() {
        assert!(is_prime(CIPHER_MODULUS));
        assert!(is_prime(PLAIN_MODULUS));
    }

    #[test]
    fn test_barrett_matches_u128_remainder() {
        let m = Modulus::new(CIPHER_MODULUS).expect("modulus");
        let q = CIPHER_MODULUS;
        let samples = [0, 1, 2, q / 3, q / 2, q - 2, q - 1, 0x1234_5678_9abc_def0 % q];
        for &a in &samples {
            for &b in &samples {
                let expected = ((a as u128 * b as u128) % q as u128) as u64;
                assert_eq!(m.mul(a, b), expected, "{a} * {b}");
            }
        }
    }

    #[test]
    fn test_shoup_matches_mul() {
        let m = Modulus::new(CIPHER_MODULUS).expect("modulus");
        let w = 543_162_789_430_183_845u64;
        let ws = m.shoup(w);
        for a in [0, 1, 77, CIPHER_MODULUS - 1, CIPHER_MODULUS / 5] {
            assert_eq!(m.mul_shoup(a, w, ws), m.mul(a, w));
        }
    }

    #[test]
    fn test_small_modulus_ops() {
        let m = Modulus::new(PLAIN_MODULUS).expect("modulus");
        assert_eq!(m.add(PLAIN_MODULUS - 1, 2), 1);
        assert_eq!(m.sub(1, 2), PLAIN_MODULUS - 1);
        assert_eq!(m.neg(0), 0);
        assert_eq!(m.from_i64(-1), PLAIN_MODULUS - 1);
        let inv = m.inv(12345).expect("invertible");
        assert_eq!(m.mul(inv, 12345), 1);
        assert!(m.inv(0).is_none());
    }

    #[test]
    fn test_roots_of_unity() {
        let order = 2 * POLY_DEGREE as u64;
        for p in [CIPHER_MODULUS, PLAIN_MODULUS] {
            let m = Modulus::new(p).expect("modulus");
            let psi = m.primitive_root_of_unity(order).expect("root");
            assert_eq!(m.pow(psi, order), 1);
            assert_eq!(m.pow(psi, order / 2), p - 1);
        }
    }

    #[test]
    fn test_rejects_bad_modulus() {
        assert!(Modulus::new(1).is_err());
        assert!(Modulus::new(1 << 62).is_err());
    }
}
