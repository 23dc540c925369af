//! Growable prefix window over the message sequence.
//!
//! The window keeps only a requested count and the generation of the
//! sequence it was sized for. The visible slice is recomputed from the
//! caller's sequence on every access.

use crate::error::ChatError;

#[derive(Clone, Debug)]
pub struct PaginationWindow {
    page_size: usize,
    requested: usize,
    generation: u64,
}

impl PaginationWindow {
    pub fn new(page_size: usize) -> Result<Self, ChatError> {
        if page_size == 0 {
            return Err(ChatError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page_size,
            requested: page_size,
            generation: 0,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Sync with the sequence generation. A new generation (session switch,
    /// reload, clear) shrinks the window back to one page; appends do not
    /// change the generation and leave it alone.
    ///
    /// Returns true if the window was reset.
    pub fn observe(&mut self, generation: u64) -> bool {
        if generation == self.generation {
            return false;
        }
        self.generation = generation;
        self.requested = self.page_size;
        true
    }

    /// Number of elements currently shown out of `len`.
    pub fn displayed(&self, len: usize) -> usize {
        self.requested.min(len)
    }

    pub fn visible_slice<'a, T>(&self, sequence: &'a [T]) -> &'a [T] {
        &sequence[..self.displayed(sequence.len())]
    }

    /// Reveal one more page. No-op once everything is shown.
    ///
    /// Returns true if the displayed count grew.
    pub fn load_more(&mut self, len: usize) -> bool {
        let displayed = self.displayed(len);
        if displayed >= len {
            return false;
        }
        self.requested = (displayed + self.page_size).min(len);
        true
    }

    pub fn can_load_more(&self, len: usize) -> bool {
        self.displayed(len) < len
    }

    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size)
    }
}
