//! Byte layouts of homomorphic queries and answers.
//!
//! All integers are little-endian. Every coefficient is checked to be below
//! the ciphertext modulus on the way in.
//!
//! ```text
//! Query  = u32 block_count
//!          block_count x (seed[32] || c0[N x u64])
//!          2 x DIGITS x (seed[32] || k0[N x u64])    rotate-right key, then row-swap key
//! Answer = c0[N x u64] || c1[N x u64]
//! ```

use crate::bfv::{Ciphertext, SeededCiphertext, SeededGaloisKey};
use crate::params::{CIPHER_MODULUS, DECOMPOSITION_DIGITS, POLY_DEGREE};
use crate::sampling::Seed;
use crate::{PirError, Result};

const POLY_BYTES: usize = POLY_DEGREE * 8;
const SEEDED_POLY_BYTES: usize = 32 + POLY_BYTES;
const GALOIS_KEY_BYTES: usize = DECOMPOSITION_DIGITS * SEEDED_POLY_BYTES;

/// Bytes of a serialized answer.
pub const ANSWER_BYTES: usize = 2 * POLY_BYTES;

pub struct Query {
    pub ciphertexts: Vec<SeededCiphertext>,
    pub rotate_right: SeededGaloisKey,
    pub row_swap: SeededGaloisKey,
}

/// Serialized query size for `blocks` selection ciphertexts.
pub fn query_bytes(blocks: usize) -> usize {
    4 + blocks * SEEDED_POLY_BYTES + 2 * GALOIS_KEY_BYTES
}

fn write_poly(out: &mut Vec<u8>, poly: &[u64]) {
    for c in poly {
        out.extend_from_slice(&c.to_le_bytes());
    }
}

fn read_poly(data: &[u8]) -> Result<Vec<u64>> {
    data.chunks_exact(8)
        .map(|w| {
            let mut word = [0u8; 8];
            word.copy_from_slice(w);
            let c = u64::from_le_bytes(word);
            if c >= CIPHER_MODULUS {
                Err(PirError::MalformedQuery("coefficient not reduced".into()))
            } else {
                Ok(c)
            }
        })
        .collect()
}

fn read_seed(data: &[u8]) -> Seed {
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&data[..32]);
    seed
}

fn write_galois_key(out: &mut Vec<u8>, key: &SeededGaloisKey) {
    for (seed, k0) in key.seeds.iter().zip(&key.k0) {
        out.extend_from_slice(seed);
        write_poly(out, k0);
    }
}

fn read_galois_key(data: &[u8]) -> Result<SeededGaloisKey> {
    let mut key = SeededGaloisKey {
        k0: Vec::with_capacity(DECOMPOSITION_DIGITS),
        seeds: Vec::with_capacity(DECOMPOSITION_DIGITS),
    };
    for digit in data.chunks_exact(SEEDED_POLY_BYTES) {
        key.seeds.push(read_seed(digit));
        key.k0.push(read_poly(&digit[32..])?);
    }
    Ok(key)
}

impl Query {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(query_bytes(self.ciphertexts.len()));
        out.extend_from_slice(&(self.ciphertexts.len() as u32).to_le_bytes());
        for ct in &self.ciphertexts {
            out.extend_from_slice(&ct.seed);
            write_poly(&mut out, &ct.c0);
        }
        write_galois_key(&mut out, &self.rotate_right);
        write_galois_key(&mut out, &self.row_swap);
        out
    }

    /// Parse a query, reading at most `max_blocks` selection ciphertexts.
    ///
    /// Extra ciphertexts beyond the database are skipped without parsing.
    pub fn from_bytes(data: &[u8], max_blocks: usize) -> Result<Self> {
        if data.len() < 4 {
            return Err(PirError::MalformedQuery("missing block count".into()));
        }
        let mut count = [0u8; 4];
        count.copy_from_slice(&data[..4]);
        let blocks = u32::from_le_bytes(count) as usize;
        if data.len() != query_bytes(blocks) {
            return Err(PirError::MalformedQuery(format!(
                "{} bytes for {blocks} blocks, expected {}",
                data.len(),
                query_bytes(blocks)
            )));
        }
        if blocks == 0 {
            return Err(PirError::EmptyQuery);
        }

        let body = &data[4..];
        let ciphertexts = body[..blocks * SEEDED_POLY_BYTES]
            .chunks_exact(SEEDED_POLY_BYTES)
            .take(max_blocks)
            .map(|chunk| {
                Ok(SeededCiphertext {
                    seed: read_seed(chunk),
                    c0: read_poly(&chunk[32..])?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let keys = &body[blocks * SEEDED_POLY_BYTES..];
        Ok(Self {
            ciphertexts,
            rotate_right: read_galois_key(&keys[..GALOIS_KEY_BYTES])?,
            row_swap: read_galois_key(&keys[GALOIS_KEY_BYTES..])?,
        })
    }
}

pub fn answer_to_bytes(ct: &Ciphertext) -> Vec<u8> {
    let mut out = Vec::with_capacity(ANSWER_BYTES);
    write_poly(&mut out, &ct.c0);
    write_poly(&mut out, &ct.c1);
    out
}

pub fn answer_from_bytes(data: &[u8]) -> Result<Ciphertext> {
    if data.len() != ANSWER_BYTES {
        return Err(PirError::MalformedAnswer(format!(
            "{} bytes, expected {ANSWER_BYTES}",
            data.len()
        )));
    }
    let parse = |half: &[u8]| {
        read_poly(half).map_err(|_| PirError::MalformedAnswer("coefficient not reduced".into()))
    };
    Ok(Ciphertext {
        c0: parse(&data[..POLY_BYTES])?,
        c1: parse(&data[POLY_BYTES..])?,
    })
}
