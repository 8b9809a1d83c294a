//! How a row's bytes map onto slot values.
//!
//! Column `j` carries bits `[j·PLAIN_BITS, (j+1)·PLAIN_BITS)` of the row,
//! most significant bit first. Bits past the end of the row read as zero.

use murmur_types::{PirValue, MESSAGE_SIZE};

use crate::params::{DB_COLUMNS, PLAIN_BITS};

const ROW_BITS: usize = MESSAGE_SIZE * 8;
const VALUE_MASK: u32 = (1 << PLAIN_BITS) - 1;

/// Split a row into `DB_COLUMNS` values of `PLAIN_BITS` bits each.
pub fn row_to_columns(row: &[u8]) -> [u64; DB_COLUMNS] {
    let mut out = [0u64; DB_COLUMNS];
    for (j, value) in out.iter_mut().enumerate() {
        let bit = j * PLAIN_BITS;
        let byte = bit / 8;
        // A 32-bit big-endian window always covers the 18 bits plus the
        // up-to-7-bit offset.
        let mut window = [0u8; 4];
        for (k, w) in window.iter_mut().enumerate() {
            *w = row.get(byte + k).copied().unwrap_or(0);
        }
        let shift = 32 - PLAIN_BITS - (bit % 8);
        *value = ((u32::from_be_bytes(window) >> shift) & VALUE_MASK) as u64;
    }
    out
}

/// Reassemble a row from the low `PLAIN_BITS` bits of each column value.
pub fn columns_to_row(values: &[u64]) -> PirValue {
    let mut row = [0u8; MESSAGE_SIZE];
    for (j, &value) in values.iter().take(DB_COLUMNS).enumerate() {
        for b in 0..PLAIN_BITS {
            let bit = j * PLAIN_BITS + b;
            if bit >= ROW_BITS {
                break;
            }
            if (value >> (PLAIN_BITS - 1 - b)) & 1 == 1 {
                row[bit / 8] |= 0x80 >> (bit % 8);
            }
        }
    }
    row
}
