//! Per-slot chunk bookkeeping for one epoch.
//!
//! A slot holds at most one chunk. It gets the next one only after it reports
//! the final paragraph of the chunk it holds.
use crate::chunk::{Chunk, ChunkSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Busy { chunk_index: usize, last_ordinal: usize },
    /// The worker is gone. Never scheduled again.
    Dead,
}

#[derive(Debug, Clone)]
pub struct ChunkSchedule {
    slots: Vec<SlotState>,
}

impl ChunkSchedule {
    pub fn new(slot_count: usize) -> Self { Self { slots: vec![SlotState::Idle; slot_count] } }

    pub fn slot(&self, slot: usize) -> Option<SlotState> { self.slots.get(slot).copied() }

    pub fn live_count(&self) -> usize { self.slots.iter().filter(|s| **s != SlotState::Dead).count() }

    pub fn busy_count(&self) -> usize { self.slots.iter().filter(|s| matches!(s, SlotState::Busy { .. })).count() }

    /// Reset every live slot and hand each one its first chunk, in slot order.
    pub fn start_epoch(&mut self, source: &mut ChunkSource) -> Vec<(usize, Chunk)> {
        let mut assigned = Vec::new();
        for slot in 0..self.slots.len() {
            if self.slots[slot] == SlotState::Dead {
                continue;
            }
            self.slots[slot] = SlotState::Idle;
            if let Some(chunk) = self.assign(slot, source) {
                assigned.push((slot, chunk));
            }
        }
        assigned
    }

    /// Record that `slot` reported `ordinal`. Returns the slot's next chunk
    /// when that ordinal closes its current one.
    pub fn on_result(&mut self, slot: usize, ordinal: usize, source: &mut ChunkSource) -> Option<Chunk> {
        match self.slots.get(slot)? {
            SlotState::Busy { last_ordinal, .. } if *last_ordinal == ordinal => {
                self.slots[slot] = SlotState::Idle;
                self.assign(slot, source)
            }
            _ => None,
        }
    }

    /// Retire `slot`. Returns the index of the chunk it was holding; that
    /// chunk is not reassigned.
    pub fn mark_dead(&mut self, slot: usize) -> Option<usize> {
        let state = self.slots.get_mut(slot)?;
        let abandoned = match *state {
            SlotState::Busy { chunk_index, .. } => Some(chunk_index),
            _ => None,
        };
        *state = SlotState::Dead;
        abandoned
    }

    fn assign(&mut self, slot: usize, source: &mut ChunkSource) -> Option<Chunk> {
        let chunk = source.next_chunk()?;
        // chunks from a non-empty slice always have a last paragraph
        let last_ordinal = chunk.last_ordinal()?;
        self.slots[slot] = SlotState::Busy { chunk_index: chunk.index, last_ordinal };
        Some(chunk)
    }
}
