//! Server side of the homomorphic PIR engine.
//!
//! Rows are grouped into blocks of `SLOT_COUNT`. For each block the engine
//! keeps `DB_COLUMNS` NTT-form plaintexts; plaintext `j` of block `b` holds
//! column `j` of every row in the block, one row per slot.

use murmur_types::{PirIndex, PirValue, MESSAGE_SIZE};
use tracing::debug;

use crate::bfv::{BfvContext, Ciphertext, GaloisElement, GaloisKey};
use crate::params::{DB_COLUMNS, POLY_DEGREE, SLOT_COUNT};
use crate::wire::{self, Query};
use crate::{layout, Pir, PirError, Result};

pub struct FastPir {
    ctx: BfvContext,
    rows: Vec<PirValue>,
    /// `[block][column]` NTT-form plaintexts.
    blocks: Vec<Vec<Vec<u64>>>,
}

impl FastPir {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ctx: BfvContext::new()?,
            rows: Vec::new(),
            blocks: Vec::new(),
        })
    }

    fn zero_block() -> Vec<Vec<u64>> {
        vec![vec![0u64; POLY_DEGREE]; DB_COLUMNS]
    }

    /// Re-encode the block holding `block * SLOT_COUNT ..`.
    fn encode_block(&mut self, block: usize) -> Result<()> {
        let start = block * SLOT_COUNT;
        let mut columns = vec![vec![0u64; SLOT_COUNT]; DB_COLUMNS];
        for (slot, row) in self.rows.iter().skip(start).take(SLOT_COUNT).enumerate() {
            for (j, value) in layout::row_to_columns(row).into_iter().enumerate() {
                columns[j][slot] = value;
            }
        }
        let encoded = columns
            .iter()
            .map(|slots| {
                let coeffs = self.ctx.encoder().encode(slots)?;
                Ok(self.ctx.plaintext_to_ntt(&coeffs))
            })
            .collect::<Result<Vec<_>>>()?;
        self.blocks[block] = encoded;
        Ok(())
    }

    /// `s = c_last; s = rotate_right(s) + c_i` down to `c_0`, which places
    /// column `i` one slot further right than column `i - 1`.
    fn horner_merge(&self, columns: &[Ciphertext], rotate: &GaloisKey) -> Option<Ciphertext> {
        let (last, rest) = columns.split_last()?;
        let mut acc = last.clone();
        for column in rest.iter().rev() {
            acc = self.ctx.apply_galois(&acc, rotate);
            self.ctx.add_inplace(&mut acc, column);
        }
        Some(acc)
    }
}

impl Pir for FastPir {
    fn set_value(&mut self, index: PirIndex, value: &PirValue) -> Result<()> {
        let i = index as usize;
        let rows = self.rows.len();
        let row = self
            .rows
            .get_mut(i)
            .ok_or(PirError::IndexOutOfRange { index, rows })?;
        *row = *value;
        self.encode_block(i / SLOT_COUNT)
    }

    fn allocate(&mut self) -> Result<PirIndex> {
        let index = PirIndex::try_from(self.rows.len())
            .map_err(|_| PirError::Parameters("database full".into()))?;
        self.rows.push([0u8; MESSAGE_SIZE]);
        if self.rows.len() > self.blocks.len() * SLOT_COUNT {
            self.blocks.push(Self::zero_block());
        }
        Ok(index)
    }

    fn allocate_to_max(&mut self, max: PirIndex) -> Result<()> {
        while self.rows.len() <= max as usize {
            self.allocate()?;
        }
        Ok(())
    }

    fn get_value_privately(&self, query: &[u8]) -> Result<Vec<u8>> {
        if self.rows.is_empty() {
            return Err(PirError::EmptyDatabase);
        }
        let query = Query::from_bytes(query, self.blocks.len())?;
        let rotate = self
            .ctx
            .expand_galois_key(&query.rotate_right, GaloisElement::RotateRight)?;
        let swap = self
            .ctx
            .expand_galois_key(&query.row_swap, GaloisElement::RowSwap)?;
        let selectors: Vec<Ciphertext> = query
            .ciphertexts
            .iter()
            .map(|ct| self.ctx.expand_ciphertext(ct))
            .collect();

        // Per column, select the row homomorphically across blocks.
        let columns: Vec<Ciphertext> = (0..DB_COLUMNS)
            .map(|j| {
                let mut acc = Ciphertext::zero();
                for (selector, block) in selectors.iter().zip(&self.blocks) {
                    self.ctx.multiply_plain_accumulate(&mut acc, selector, &block[j]);
                }
                acc
            })
            .collect();

        // Top half of the columns lands in the target's row, bottom half in
        // the other row after a swap.
        let split = DB_COLUMNS.div_ceil(2);
        let mut answer = self
            .horner_merge(&columns[..split], &rotate)
            .ok_or(PirError::EmptyQuery)?;
        if let Some(bottom) = self.horner_merge(&columns[split..], &rotate) {
            let swapped = self.ctx.apply_galois(&bottom, &swap);
            self.ctx.add_inplace(&mut answer, &swapped);
        }

        debug!(blocks = selectors.len(), "answered PIR query");
        Ok(wire::answer_to_bytes(&answer))
    }

    fn db_rows(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_grows_blocks() {
        let mut pir = FastPir::new().expect("pir");
        assert_eq!(pir.allocate().expect("allocate"), 0);
        assert_eq!(pir.blocks.len(), 1);
        pir.allocate_to_max(SLOT_COUNT as PirIndex).expect("allocate");
        assert_eq!(pir.db_rows(), SLOT_COUNT + 1);
        assert_eq!(pir.blocks.len(), 2);
    }

    #[test]
    fn test_set_value_out_of_range() {
        let mut pir = FastPir::new().expect("pir");
        pir.allocate().expect("allocate");
        assert!(matches!(
            pir.set_value(1, &[0u8; MESSAGE_SIZE]),
            Err(PirError::IndexOutOfRange { index: 1, rows: 1 })
        ));
    }

    #[test]
    fn test_empty_database_rejected() {
        let pir = FastPir::new().expect("pir");
        assert!(matches!(
            pir.get_value_privately(&[0u8; 4]),
            Err(PirError::EmptyDatabase)
        ));
    }
}
