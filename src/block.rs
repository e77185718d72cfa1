//! The backing-store block allocator: tracks which blocks of the on-disk
//! backing store are free and hands them out lowest-index first.

use std::collections::BTreeSet;

use crate::error::PagerError;
use crate::page::BlockIndex;

/// Tracks which of the `B` backing-store blocks are free.
pub struct BlockAllocator {
    total: usize,
    free: BTreeSet<BlockIndex>,
}

impl BlockAllocator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            free: (0..total).collect(),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Returns the lowest-index free block, failing with [`PagerError::NoSpace`]
    /// when the pool is empty.
    pub fn allocate(&mut self) -> Result<BlockIndex, PagerError> {
        let block = *self.free.iter().next().ok_or(PagerError::NoSpace)?;
        self.free.remove(&block);
        Ok(block)
    }

    /// Restores `block` to the pool. Releasing an already-free block is a
    /// silent no-op: `BTreeSet::insert` of a present value is itself a
    /// no-op, so this can never duplicate a block into the free set and
    /// hand it out twice.
    pub fn release(&mut self, block: BlockIndex) {
        debug_assert!(block < self.total);
        self.free.insert(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_returns_lowest_index_first() {
        let mut alloc = BlockAllocator::new(3);
        assert_eq!(alloc.allocate(), Ok(0));
        assert_eq!(alloc.allocate(), Ok(1));
    }

    #[test]
    fn allocate_fails_with_no_space_when_exhausted() {
        let mut alloc = BlockAllocator::new(1);
        assert_eq!(alloc.allocate(), Ok(0));
        assert_eq!(alloc.allocate(), Err(PagerError::NoSpace));
    }

    #[test]
    fn release_then_allocate_reuses_the_block() {
        let mut alloc = BlockAllocator::new(1);
        let b = alloc.allocate().unwrap();
        alloc.release(b);
        assert_eq!(alloc.allocate(), Ok(b));
    }

    #[test]
    fn double_release_does_not_duplicate_the_block() {
        let mut alloc = BlockAllocator::new(2);
        let b = alloc.allocate().unwrap();
        alloc.release(b);
        alloc.release(b);
        assert_eq!(alloc.free_count(), 2);
    }
}
