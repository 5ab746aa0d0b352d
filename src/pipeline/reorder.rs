//! Reassembly window for results that complete out of order.

use std::collections::VecDeque;

use crate::error::{Error, Result};

/// Buffers items keyed by sequence number and releases them strictly in
/// increasing order through a monotonic cursor.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    cursor: usize,
    buffered: usize,
    slots: VecDeque<Option<T>>,
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReorderBuffer<T> {
    /// Empty buffer expecting sequence number 0 first.
    pub fn new() -> Self {
        Self {
            cursor: 0,
            buffered: 0,
            slots: VecDeque::new(),
        }
    }

    /// Next sequence number to be released.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Items held back waiting for an earlier sequence number.
    pub fn len(&self) -> usize {
        self.buffered
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffered == 0
    }

    /// Store `item` under `seq`.
    ///
    /// Fails if `seq` was already released or is already occupied.
    pub fn insert(&mut self, seq: usize, item: T) -> Result<()> {
        if seq < self.cursor {
            return Err(Error::Pipeline("chunk landed after its slot was released"));
        }
        let offset = seq - self.cursor;
        if offset >= self.slots.len() {
            self.slots.resize_with(offset + 1, || None);
        }
        let slot = &mut self.slots[offset];
        if slot.is_some() {
            return Err(Error::Pipeline("chunk landed twice"));
        }
        *slot = Some(item);
        self.buffered += 1;
        Ok(())
    }

    /// Release the item at the cursor if it has arrived.
    pub fn pop_ready(&mut self) -> Option<T> {
        match self.slots.front() {
            Some(Some(_)) => {
                let item = self.slots.pop_front().flatten();
                self.cursor += 1;
                self.buffered -= 1;
                item
            }
            _ => None,
        }
    }

    /// Drop everything still buffered.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.buffered = 0;
    }
}
