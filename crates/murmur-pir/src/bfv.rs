//! A minimal BFV scheme: exactly what private row selection needs.
//!
//! All polynomials mod `Q` are kept in NTT form, except transiently during
//! decryption and key switching. Client ciphertexts are encrypted
//! symmetrically and *seeded*: the uniform half is replaced by the 32-byte
//! seed it was expanded from.
//!
//! ```text
//! Encrypt(s, m):       a <- Expand(seed);  c0 = -a·s + e + DELTA·m;  c1 = a
//! Decrypt(s, c):       x = c0 + c1·s;      m = round(T·x / Q) mod T
//! GaloisKey(s, g):     for j in 0..4: k0_j = -a_j·s + e_j + 2^(16j)·sigma_g(s);  k1_j = a_j
//! KeySwitch(c, g):     d = sigma_g(c1) = sum_j D_j·2^(16j)
//!                      c' = (sigma_g(c0) + sum_j D_j·k0_j,  sum_j D_j·k1_j)
//! ```

use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::encoder::BatchEncoder;
use crate::modulus::Modulus;
use crate::ntt::{apply_permutation, GaloisTables, NttTables};
use crate::params::{
    CIPHER_MODULUS, DECOMPOSITION_BITS, DECOMPOSITION_DIGITS, DELTA, GALOIS_ROTATE_RIGHT,
    GALOIS_ROW_SWAP, PLAIN_MODULUS, POLY_DEGREE,
};
use crate::sampling::{self, Seed};
use crate::{PirError, Result};

/// The two rotations the server needs to compress an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GaloisElement {
    RotateRight,
    RowSwap,
}

impl GaloisElement {
    pub fn exponent(self) -> usize {
        match self {
            Self::RotateRight => GALOIS_ROTATE_RIGHT,
            Self::RowSwap => GALOIS_ROW_SWAP,
        }
    }
}

/// Ternary secret, NTT form.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey {
    ntt: Vec<u64>,
}

/// A ciphertext with both halves in NTT form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ciphertext {
    pub c0: Vec<u64>,
    pub c1: Vec<u64>,
}

impl Ciphertext {
    pub fn zero() -> Self {
        Self {
            c0: vec![0; POLY_DEGREE],
            c1: vec![0; POLY_DEGREE],
        }
    }
}

/// A fresh client ciphertext whose `c1` is carried as its seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeededCiphertext {
    pub c0: Vec<u64>,
    pub seed: Seed,
}

/// A key-switching key for one Galois element, seeded like a ciphertext.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeededGaloisKey {
    pub k0: Vec<Vec<u64>>,
    pub seeds: Vec<Seed>,
}

/// A Galois key with its uniform halves expanded, ready for key switching.
pub struct GaloisKey {
    element: GaloisElement,
    k0: Vec<Vec<u64>>,
    k1: Vec<Vec<u64>>,
}

/// Shared tables for one parameter set. Built once per engine.
pub struct BfvContext {
    q: Modulus,
    q_ntt: NttTables,
    encoder: BatchEncoder,
    rotate_right_perm: Vec<usize>,
    row_swap_perm: Vec<usize>,
}

impl BfvContext {
    pub fn new() -> Result<Self> {
        let q = Modulus::new(CIPHER_MODULUS)?;
        let q_ntt = NttTables::new(q, POLY_DEGREE)?;
        let galois = GaloisTables::new(&q_ntt)?;
        Ok(Self {
            q,
            rotate_right_perm: galois.permutation(GALOIS_ROTATE_RIGHT),
            row_swap_perm: galois.permutation(GALOIS_ROW_SWAP),
            q_ntt,
            encoder: BatchEncoder::new()?,
        })
    }

    pub fn encoder(&self) -> &BatchEncoder {
        &self.encoder
    }

    fn permutation(&self, element: GaloisElement) -> &[usize] {
        match element {
            GaloisElement::RotateRight => &self.rotate_right_perm,
            GaloisElement::RowSwap => &self.row_swap_perm,
        }
    }

    fn expand(&self, seed: &Seed) -> Vec<u64> {
        sampling::uniform_from_seed(seed, &self.q, POLY_DEGREE)
    }

    fn error_ntt<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Vec<u64> {
        let mut e = sampling::centered_binomial(rng, &self.q, POLY_DEGREE);
        self.q_ntt.forward(&mut e);
        e
    }

    pub fn generate_secret_key<R: RngCore + CryptoRng>(&self, rng: &mut R) -> SecretKey {
        let mut s = sampling::ternary(rng, &self.q, POLY_DEGREE);
        self.q_ntt.forward(&mut s);
        SecretKey { ntt: s }
    }

    /// `-a·s + e` for a fresh seed, plus the seed.
    fn rlwe_sample<R: RngCore + CryptoRng>(&self, sk: &SecretKey, rng: &mut R) -> (Vec<u64>, Seed) {
        let seed = sampling::random_seed(rng);
        let a = self.expand(&seed);
        let e = self.error_ntt(rng);
        let q = &self.q;
        let c0 = a
            .iter()
            .zip(&sk.ntt)
            .zip(&e)
            .map(|((&a, &s), &e)| q.add(q.neg(q.mul(a, s)), e))
            .collect();
        (c0, seed)
    }

    /// Encrypt plaintext coefficients mod `T`, or zero when `plain` is `None`.
    pub fn encrypt_seeded<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        plain: Option<&[u64]>,
        rng: &mut R,
    ) -> SeededCiphertext {
        let (mut c0, seed) = self.rlwe_sample(sk, rng);
        if let Some(plain) = plain {
            let mut scaled: Vec<u64> = plain
                .iter()
                .map(|&m| self.q.mul(m % PLAIN_MODULUS, DELTA))
                .collect();
            self.q_ntt.forward(&mut scaled);
            for (c, m) in c0.iter_mut().zip(&scaled) {
                *c = self.q.add(*c, *m);
            }
        }
        SeededCiphertext { c0, seed }
    }

    pub fn expand_ciphertext(&self, ct: &SeededCiphertext) -> Ciphertext {
        Ciphertext {
            c0: ct.c0.clone(),
            c1: self.expand(&ct.seed),
        }
    }

    /// Decrypt to plaintext coefficients mod `T`.
    pub fn decrypt(&self, sk: &SecretKey, ct: &Ciphertext) -> Vec<u64> {
        let q = &self.q;
        let mut x: Vec<u64> = ct
            .c0
            .iter()
            .zip(&ct.c1)
            .zip(&sk.ntt)
            .map(|((&c0, &c1), &s)| q.add(c0, q.mul(c1, s)))
            .collect();
        self.q_ntt.inverse(&mut x);

        let q_wide = CIPHER_MODULUS as u128;
        x.iter()
            .map(|&v| {
                let scaled = (PLAIN_MODULUS as u128 * v as u128 + q_wide / 2) / q_wide;
                (scaled % PLAIN_MODULUS as u128) as u64
            })
            .collect()
    }

    /// Lift plaintext coefficients mod `T` to centered representatives mod
    /// `Q`, in NTT form, ready for [`multiply_plain_accumulate`](Self::multiply_plain_accumulate).
    pub fn plaintext_to_ntt(&self, plain: &[u64]) -> Vec<u64> {
        let half = PLAIN_MODULUS / 2;
        let mut lifted: Vec<u64> = plain
            .iter()
            .map(|&m| {
                let m = m % PLAIN_MODULUS;
                if m > half {
                    CIPHER_MODULUS - (PLAIN_MODULUS - m)
                } else {
                    m
                }
            })
            .collect();
        self.q_ntt.forward(&mut lifted);
        lifted
    }

    /// `acc += ct ⊙ plain`.
    pub fn multiply_plain_accumulate(&self, acc: &mut Ciphertext, ct: &Ciphertext, plain: &[u64]) {
        let q = &self.q;
        for i in 0..POLY_DEGREE {
            acc.c0[i] = q.add(acc.c0[i], q.mul(ct.c0[i], plain[i]));
            acc.c1[i] = q.add(acc.c1[i], q.mul(ct.c1[i], plain[i]));
        }
    }

    /// `acc += other`.
    pub fn add_inplace(&self, acc: &mut Ciphertext, other: &Ciphertext) {
        let q = &self.q;
        for i in 0..POLY_DEGREE {
            acc.c0[i] = q.add(acc.c0[i], other.c0[i]);
            acc.c1[i] = q.add(acc.c1[i], other.c1[i]);
        }
    }

    pub fn generate_galois_key<R: RngCore + CryptoRng>(
        &self,
        sk: &SecretKey,
        element: GaloisElement,
        rng: &mut R,
    ) -> SeededGaloisKey {
        let q = &self.q;
        let sigma_s = apply_permutation(&sk.ntt, self.permutation(element));
        let mut k0 = Vec::with_capacity(DECOMPOSITION_DIGITS);
        let mut seeds = Vec::with_capacity(DECOMPOSITION_DIGITS);
        for j in 0..DECOMPOSITION_DIGITS {
            let (mut sample, seed) = self.rlwe_sample(sk, rng);
            let gadget = q.reduce(1u64 << (DECOMPOSITION_BITS as usize * j));
            for (k, &s) in sample.iter_mut().zip(&sigma_s) {
                *k = q.add(*k, q.mul(gadget, s));
            }
            k0.push(sample);
            seeds.push(seed);
        }
        SeededGaloisKey { k0, seeds }
    }

    pub fn expand_galois_key(
        &self,
        key: &SeededGaloisKey,
        element: GaloisElement,
    ) -> Result<GaloisKey> {
        if key.k0.len() != DECOMPOSITION_DIGITS || key.seeds.len() != DECOMPOSITION_DIGITS {
            return Err(PirError::MalformedQuery(format!(
                "galois key has {} digits, expected {DECOMPOSITION_DIGITS}",
                key.k0.len()
            )));
        }
        Ok(GaloisKey {
            element,
            k0: key.k0.clone(),
            k1: key.seeds.iter().map(|s| self.expand(s)).collect(),
        })
    }

    /// Apply `X -> X^g` to a ciphertext and switch it back to the original key.
    pub fn apply_galois(&self, ct: &Ciphertext, key: &GaloisKey) -> Ciphertext {
        let q = &self.q;
        let perm = self.permutation(key.element);
        let mut c0 = apply_permutation(&ct.c0, perm);
        let mut d = apply_permutation(&ct.c1, perm);
        self.q_ntt.inverse(&mut d);

        let digit_mask = (1u64 << DECOMPOSITION_BITS) - 1;
        let mut c1 = vec![0u64; POLY_DEGREE];
        let mut digit = vec![0u64; POLY_DEGREE];
        for j in 0..DECOMPOSITION_DIGITS {
            let shift = DECOMPOSITION_BITS as usize * j;
            for (out, &v) in digit.iter_mut().zip(&d) {
                *out = (v >> shift) & digit_mask;
            }
            self.q_ntt.forward(&mut digit);
            for i in 0..POLY_DEGREE {
                c0[i] = q.add(c0[i], q.mul(digit[i], key.k0[j][i]));
                c1[i] = q.add(c1[i], q.mul(digit[i], key.k1[j][i]));
            }
        }
        Ciphertext { c0, c1 }
    }
}
