//! A PIR engine that sends the index in the clear.
//!
//! It offers no privacy at all. It exists so protocol tests can run many
//! rounds quickly with the same wire shapes as the real engine's callers see.

use murmur_types::{PirIndex, PirValue, MESSAGE_SIZE};

use crate::{Pir, PirClient, PirError, Result};

#[derive(Default)]
pub struct NonPrivatePir {
    rows: Vec<PirValue>,
}

impl NonPrivatePir {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Pir for NonPrivatePir {
    fn set_value(&mut self, index: PirIndex, value: &PirValue) -> Result<()> {
        let rows = self.rows.len();
        let row = self
            .rows
            .get_mut(index as usize)
            .ok_or(PirError::IndexOutOfRange { index, rows })?;
        *row = *value;
        Ok(())
    }

    fn allocate(&mut self) -> Result<PirIndex> {
        let index = PirIndex::try_from(self.rows.len())
            .map_err(|_| PirError::Parameters("database full".into()))?;
        self.rows.push([0u8; MESSAGE_SIZE]);
        Ok(index)
    }

    fn allocate_to_max(&mut self, max: PirIndex) -> Result<()> {
        if self.rows.len() <= max as usize {
            self.rows.resize(max as usize + 1, [0u8; MESSAGE_SIZE]);
        }
        Ok(())
    }

    fn get_value_privately(&self, query: &[u8]) -> Result<Vec<u8>> {
        if self.rows.is_empty() {
            return Err(PirError::EmptyDatabase);
        }
        let index: [u8; 4] = query
            .try_into()
            .map_err(|_| PirError::MalformedQuery(format!("{} byte index", query.len())))?;
        // Out-of-range reads (the dummy index) return an empty row.
        Ok(self
            .rows
            .get(u32::from_le_bytes(index) as usize)
            .map_or_else(|| vec![0u8; MESSAGE_SIZE], |row| row.to_vec()))
    }

    fn db_rows(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Default)]
pub struct NonPrivatePirClient;

impl NonPrivatePirClient {
    pub fn new() -> Self {
        Self
    }
}

impl PirClient for NonPrivatePirClient {
    fn query(&mut self, index: PirIndex, _db_rows: usize) -> Result<Vec<u8>> {
        Ok(index.to_le_bytes().to_vec())
    }

    fn decode(&self, answer: &[u8], _index: PirIndex) -> Result<PirValue> {
        answer
            .try_into()
            .map_err(|_| PirError::MalformedAnswer(format!("{} byte row", answer.len())))
    }
}
