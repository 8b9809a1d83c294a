//! Client side of the homomorphic PIR engine.
//!
//! Every query uses a brand-new secret key and keyset, so a server that
//! replays or correlates old answers learns nothing from key reuse. The key
//! is remembered per index until the next query for that index replaces it.

use std::collections::HashMap;

use murmur_types::{PirIndex, PirValue};
use rand::rngs::OsRng;

use crate::bfv::{BfvContext, GaloisElement, SecretKey};
use crate::params::{DB_COLUMNS, ROW_SIZE, SLOT_COUNT};
use crate::wire::{self, Query};
use crate::{layout, PirClient, PirError, Result};

pub struct FastPirClient {
    ctx: BfvContext,
    keys: HashMap<PirIndex, SecretKey>,
}

impl FastPirClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ctx: BfvContext::new()?,
            keys: HashMap::new(),
        })
    }
}

impl PirClient for FastPirClient {
    fn query(&mut self, index: PirIndex, db_rows: usize) -> Result<Vec<u8>> {
        let rng = &mut OsRng;
        let sk = self.ctx.generate_secret_key(rng);

        let blocks = db_rows.div_ceil(SLOT_COUNT).max(1);
        let target_block = index as usize / SLOT_COUNT;
        let mut one_hot = vec![0u64; SLOT_COUNT];
        one_hot[index as usize % SLOT_COUNT] = 1;
        let selection = self.ctx.encoder().encode(&one_hot)?;

        // Each block gets its own fresh encryption, including the zero ones.
        let ciphertexts = (0..blocks)
            .map(|b| {
                let plain = (b == target_block).then_some(selection.as_slice());
                self.ctx.encrypt_seeded(&sk, plain, rng)
            })
            .collect();

        let query = Query {
            ciphertexts,
            rotate_right: self
                .ctx
                .generate_galois_key(&sk, GaloisElement::RotateRight, rng),
            row_swap: self.ctx.generate_galois_key(&sk, GaloisElement::RowSwap, rng),
        };
        self.keys.insert(index, sk);
        Ok(query.to_bytes())
    }

    fn decode(&self, answer: &[u8], index: PirIndex) -> Result<PirValue> {
        let sk = self.keys.get(&index).ok_or(PirError::NoKeyForIndex(index))?;
        let ct = wire::answer_from_bytes(answer)?;
        let mut slots = self.ctx.encoder().decode(&self.ctx.decrypt(sk, &ct));

        let position = index as usize % SLOT_COUNT;
        // The server merged into the target's row; bring that row to the top.
        if position >= ROW_SIZE {
            let (top, bottom) = slots.split_at_mut(ROW_SIZE);
            top.swap_with_slice(bottom);
        }
        let offset = position % ROW_SIZE;
        for row in slots.chunks_exact_mut(ROW_SIZE) {
            row.rotate_left(offset);
        }

        let split = DB_COLUMNS.div_ceil(2);
        let columns: Vec<u64> = (0..DB_COLUMNS)
            .map(|j| {
                if j < split {
                    slots[j]
                } else {
                    slots[ROW_SIZE + j - split]
                }
            })
            .collect();
        Ok(layout::columns_to_row(&columns))
    }
}
