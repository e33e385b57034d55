//! Fixed-capacity index-to-expression map holding the compiled program.
//!
//! Slot `0` is the entry point (`galaxy`). Other slots hold auxiliary
//! functions referenced by `FUN` nodes. Unoccupied slots are `None`.

use crate::error::FatalError;
use crate::expr::ExprRef;

/// The compiled program: a dense array of optional expression references.
#[derive(Debug)]
pub struct FunctionTable {
    slots: Vec<Option<ExprRef>>,
}

impl FunctionTable {
    /// An empty table with `capacity` slots, all unoccupied.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    /// Capacity configured for this table.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Define `index` as `expr`, bounds-checked against this table's
    /// capacity.
    pub fn define(&mut self, index: i64, expr: ExprRef) -> Result<(), FatalError> {
        let slot = self.slot_index(index)?;
        self.slots[slot] = Some(expr);
        Ok(())
    }

    /// Look up `index`, distinguishing "out of range" from "in range but
    /// never defined".
    pub fn get(&self, index: i64) -> Result<ExprRef, FatalError> {
        let slot = self.slot_index(index)?;
        self.slots[slot].ok_or(FatalError::UnoccupiedFunctionSlot { index })
    }

    /// Iterate the occupied `(index, expr)` pairs in ascending index order —
    /// used by the image writer to reconstruct a `SCAN`-framed stream.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, ExprRef)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|e| (i, e)))
    }

    fn slot_index(&self, index: i64) -> Result<usize, FatalError> {
        if index < 0 || index as usize >= self.slots.len() {
            return Err(FatalError::FunctionSlotOutOfRange {
                index,
                capacity: self.slots.len(),
            });
        }
        Ok(index as usize)
    }
}
