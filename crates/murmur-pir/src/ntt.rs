//! Negacyclic number-theoretic transform over `Z_p[X]/(X^n + 1)`.
//!
//! Forward is Cooley-Tukey and inverse is Gentleman-Sande, both in place with
//! bit-reversed twiddles. Products of polynomials become pointwise products
//! of their transforms.

use std::collections::HashMap;

use crate::modulus::Modulus;
use crate::{PirError, Result};

pub struct NttTables {
    modulus: Modulus,
    n: usize,
    /// Primitive `2n`-th root of unity.
    psi: u64,
    root_powers: Vec<u64>,
    root_powers_shoup: Vec<u64>,
    inv_root_powers: Vec<u64>,
    inv_root_powers_shoup: Vec<u64>,
    n_inv: u64,
    n_inv_shoup: u64,
}

fn bit_reverse(x: usize, bits: u32) -> usize {
    if bits == 0 {
        0
    } else {
        x.reverse_bits() >> (usize::BITS - bits)
    }
}

impl NttTables {
    pub fn new(modulus: Modulus, n: usize) -> Result<Self> {
        if !n.is_power_of_two() || n < 2 {
            return Err(PirError::Parameters(format!("NTT length {n} is not a power of two")));
        }
        let log_n = n.trailing_zeros();
        let psi = modulus.primitive_root_of_unity(2 * n as u64)?;
        let psi_inv = modulus
            .inv(psi)
            .ok_or_else(|| PirError::Parameters("root of unity not invertible".into()))?;

        let mut root_powers = vec![0u64; n];
        let mut inv_root_powers = vec![0u64; n];
        for (k, (fwd, inv)) in root_powers
            .iter_mut()
            .zip(inv_root_powers.iter_mut())
            .enumerate()
        {
            let e = bit_reverse(k, log_n) as u64;
            *fwd = modulus.pow(psi, e);
            *inv = modulus.pow(psi_inv, e);
        }
        let root_powers_shoup = root_powers.iter().map(|&w| modulus.shoup(w)).collect();
        let inv_root_powers_shoup = inv_root_powers.iter().map(|&w| modulus.shoup(w)).collect();
        let n_inv = modulus
            .inv(n as u64)
            .ok_or_else(|| PirError::Parameters("n not invertible".into()))?;

        Ok(Self {
            modulus,
            n,
            psi,
            root_powers,
            root_powers_shoup,
            inv_root_powers,
            inv_root_powers_shoup,
            n_inv,
            n_inv_shoup: modulus.shoup(n_inv),
        })
    }

    pub fn modulus(&self) -> &Modulus {
        &self.modulus
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn forward(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.n);
        let md = &self.modulus;
        let mut t = self.n;
        let mut m = 1;
        while m < self.n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let w = self.root_powers[m + i];
                let ws = self.root_powers_shoup[m + i];
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = md.mul_shoup(a[j + t], w, ws);
                    a[j] = md.add(u, v);
                    a[j + t] = md.sub(u, v);
                }
            }
            m <<= 1;
        }
    }

    pub fn inverse(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.n);
        let md = &self.modulus;
        let mut t = 1;
        let mut m = self.n;
        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let w = self.inv_root_powers[h + i];
                let ws = self.inv_root_powers_shoup[h + i];
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = a[j + t];
                    a[j] = md.add(u, v);
                    a[j + t] = md.mul_shoup(md.sub(u, v), w, ws);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }
        for x in a.iter_mut() {
            *x = md.mul_shoup(*x, self.n_inv, self.n_inv_shoup);
        }
    }

    /// For each output position `i`, the odd exponent `e_i` such that
    /// position `i` holds the evaluation at `psi^(e_i)`.
    ///
    /// Found by transforming `X`, whose evaluations are the points themselves.
    pub fn evaluation_exponents(&self) -> Result<Vec<usize>> {
        let two_n = 2 * self.n;
        let mut by_value = HashMap::with_capacity(self.n);
        for e in (1..two_n).step_by(2) {
            by_value.insert(self.modulus.pow(self.psi, e as u64), e);
        }
        let mut x = vec![0u64; self.n];
        x[1] = 1;
        self.forward(&mut x);
        x.iter()
            .map(|v| {
                by_value
                    .get(v)
                    .copied()
                    .ok_or_else(|| PirError::Parameters("NTT point is not an odd root power".into()))
            })
            .collect()
    }
}

/// Position permutations implementing `X -> X^g` on NTT-form polynomials.
pub struct GaloisTables {
    exponents: Vec<usize>,
    index_of_exponent: Vec<usize>,
}

impl GaloisTables {
    pub fn new(tables: &NttTables) -> Result<Self> {
        let exponents = tables.evaluation_exponents()?;
        let mut index_of_exponent = vec![0usize; 2 * tables.n()];
        for (i, &e) in exponents.iter().enumerate() {
            index_of_exponent[e] = i;
        }
        Ok(Self {
            exponents,
            index_of_exponent,
        })
    }

    /// Position holding the evaluation at `psi^e` (`e` odd).
    pub fn index_of(&self, exponent: usize) -> usize {
        self.index_of_exponent[exponent % self.index_of_exponent.len()]
    }

    /// `perm` with `sigma_g(a)[i] = a[perm[i]]`.
    pub fn permutation(&self, galois_elt: usize) -> Vec<usize> {
        let two_n = self.index_of_exponent.len();
        self.exponents
            .iter()
            .map(|&e| self.index_of_exponent[(e * galois_elt) % two_n])
            .collect()
    }
}

pub fn apply_permutation(a: &[u64], perm: &[usize]) -> Vec<u64> {
    perm.iter().map(|&p| a[p]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CIPHER_MODULUS, POLY_DEGREE};
    use rand::Rng;

    fn negacyclic_schoolbook(m: &Modulus, a: &[u64], b: &[u64]) -> Vec<u64> {
        let n = a.len();
        let mut out = vec![0u64; n];
        for i in 0..n {
            for j in 0..n {
                let p = m.mul(a[i], b[j]);
                let k = i + j;
                if k < n {
                    out[k] = m.add(out[k], p);
                } else {
                    out[k - n] = m.sub(out[k - n], p);
                }
            }
        }
        out
    }

    #[test]
    fn test_small_ring_product_matches_schoolbook() {
        let m = Modulus::new(97).expect("modulus");
        let tables = NttTables::new(m, 16).expect("tables");
        let mut rng = rand::thread_rng();
        let a: Vec<u64> = (0..16).map(|_| rng.gen_range(0..97)).collect();
        let b: Vec<u64> = (0..16).map(|_| rng.gen_range(0..97)).collect();

        let expected = negacyclic_schoolbook(&m, &a, &b);

        let (mut fa, mut fb) = (a.clone(), b.clone());
        tables.forward(&mut fa);
        tables.forward(&mut fb);
        let mut prod: Vec<u64> = fa.iter().zip(&fb).map(|(&x, &y)| m.mul(x, y)).collect();
        tables.inverse(&mut prod);
        assert_eq!(prod, expected);
    }

    #[test]
    fn test_forward_inverse_identity() {
        let m = Modulus::new(CIPHER_MODULUS).expect("modulus");
        let tables = NttTables::new(m, POLY_DEGREE).expect("tables");
        let mut rng = rand::thread_rng();
        let original: Vec<u64> = (0..POLY_DEGREE).map(|_| rng.gen_range(0..CIPHER_MODULUS)).collect();
        let mut a = original.clone();
        tables.forward(&mut a);
        assert_ne!(a, original);
        tables.inverse(&mut a);
        assert_eq!(a, original);
    }

    #[test]
    fn test_galois_permutation_matches_coefficient_automorphism() {
        let m = Modulus::new(97).expect("modulus");
        let n = 16;
        let tables = NttTables::new(m, n).expect("tables");
        let galois = GaloisTables::new(&tables).expect("galois");
        let a: Vec<u64> = (1..=n as u64).collect();

        for g in [3usize, 11, 2 * n - 1] {
            // X^i -> X^(i*g), with X^n = -1.
            let mut expected = vec![0u64; n];
            for (i, &c) in a.iter().enumerate() {
                let k = (i * g) % (2 * n);
                if k < n {
                    expected[k] = m.add(expected[k], c);
                } else {
                    expected[k - n] = m.sub(expected[k - n], c);
                }
            }

            let mut fa = a.clone();
            tables.forward(&mut fa);
            let mut permuted = apply_permutation(&fa, &galois.permutation(g));
            tables.inverse(&mut permuted);
            assert_eq!(permuted, expected, "g = {g}");
        }
    }
}
