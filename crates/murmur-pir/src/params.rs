//! Fixed parameters of the homomorphic PIR scheme.
//!
//! The ciphertext modulus is a single 62-bit prime with `Q ≡ 1 (mod 2N·T)`,
//! so both the ciphertext ring and the plaintext ring admit a negacyclic NTT
//! of length `N`, and `Q = DELTA·T + 1` exactly.

use murmur_types::MESSAGE_SIZE;

/// Ring dimension. Polynomials live in `Z[X]/(X^N + 1)`.
pub const POLY_DEGREE: usize = 4096;

/// Batch slots per plaintext, laid out as 2 rows of `ROW_SIZE`.
pub const SLOT_COUNT: usize = POLY_DEGREE;
pub const ROW_SIZE: usize = SLOT_COUNT / 2;

/// Ciphertext modulus.
pub const CIPHER_MODULUS: u64 = 0x3fff_fff7_c933_6001;

/// Plaintext modulus (prime, `≡ 1 mod 2N`).
pub const PLAIN_MODULUS: u64 = 270_337;

/// Payload bits carried per slot. `2^PLAIN_BITS < PLAIN_MODULUS`.
pub const PLAIN_BITS: usize = 18;

/// Plaintexts ("columns") needed to hold one row.
pub const DB_COLUMNS: usize = (MESSAGE_SIZE * 8).div_ceil(PLAIN_BITS);

/// `floor(Q / T)`.
pub const DELTA: u64 = CIPHER_MODULUS / PLAIN_MODULUS;

/// Key-switching gadget: `DECOMPOSITION_DIGITS` digits of
/// `DECOMPOSITION_BITS` bits cover the full 62-bit modulus.
pub const DECOMPOSITION_BITS: u32 = 16;
pub const DECOMPOSITION_DIGITS: usize = 4;

/// Centered binomial parameter for error sampling.
pub const NOISE_ETA: u32 = 21;

/// Galois element rotating both rows right by one slot (`3^-1 mod 2N`).
pub const GALOIS_ROTATE_RIGHT: usize = 2731;

/// Galois element swapping the two rows (`2N - 1`).
pub const GALOIS_ROW_SWAP: usize = 2 * POLY_DEGREE - 1;

/// Generator of the row rotation subgroup of `(Z/2N)^*`.
pub const ROW_GENERATOR: usize = 3;

const _: () = assert!(DB_COLUMNS.div_ceil(2) <= ROW_SIZE);
const _: () = assert!((1u64 << PLAIN_BITS) < PLAIN_MODULUS);
const _: () = assert!(CIPHER_MODULUS % PLAIN_MODULUS == 1);
const _: () = assert!((DECOMPOSITION_BITS as usize) * DECOMPOSITION_DIGITS >= 62);
const _: () = assert!((GALOIS_ROTATE_RIGHT * ROW_GENERATOR) % (2 * POLY_DEGREE) == 1);
