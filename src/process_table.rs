//! The process page table registry: a two-level structure, one dense page
//! vector per process, indexed by pid behind a `HashMap` rather than a
//! fixed-size array, since neither process count nor address-space size is
//! bounded at compile time here.

use std::collections::HashMap;

use crate::error::PagerError;
use crate::page::PageEntry;

/// Opaque process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub usize);

/// One process's dense, index-ordered page table.
///
/// Pages are never reordered or removed individually; the whole table is
/// dropped at once on process destruction.
#[derive(Default)]
pub struct ProcessTable {
    pages: Vec<PageEntry>,
}

impl ProcessTable {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn get(&self, index: usize) -> Option<&PageEntry> {
        self.pages.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PageEntry> {
        self.pages.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageEntry> {
        self.pages.iter()
    }

    /// Appends one page entry, returning its index. Fails with
    /// [`PagerError::AllocationFailure`] if the host is out of memory,
    /// leaving the table unchanged.
    pub(crate) fn push(&mut self, entry: PageEntry) -> Result<usize, PagerError> {
        self.pages
            .try_reserve(1)
            .map_err(|_| PagerError::AllocationFailure {
                reason: "page table growth failed",
            })?;
        self.pages.push(entry);
        Ok(self.pages.len() - 1)
    }
}

/// Maps process id to [`ProcessTable`].
#[derive(Default)]
pub struct Registry {
    tables: HashMap<Pid, ProcessTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_count(&self) -> usize {
        self.tables.len()
    }

    /// Registers a new, empty table for `pid`.
    ///
    /// If `pid` is already registered the prior table (and everything it
    /// owned) is silently replaced: the collaborator contract guarantees
    /// the simulator never calls `create` twice for a live pid, so this
    /// path only matters for tests that reuse a pid after `destroy`, where
    /// replacing is exactly what's wanted.
    pub fn create(&mut self, pid: Pid) {
        self.tables.insert(pid, ProcessTable::default());
    }

    pub fn lookup(&self, pid: Pid) -> Option<&ProcessTable> {
        self.tables.get(&pid)
    }

    pub fn lookup_mut(&mut self, pid: Pid) -> Option<&mut ProcessTable> {
        self.tables.get_mut(&pid)
    }

    /// Detaches and returns `pid`'s table, if registered.
    pub fn destroy(&mut self, pid: Pid) -> Option<ProcessTable> {
        self.tables.remove(&pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_lookup_finds_an_empty_table() {
        let mut registry = Registry::new();
        registry.create(Pid(1));
        assert_eq!(registry.lookup(Pid(1)).unwrap().page_count(), 0);
    }

    #[test]
    fn lookup_of_unknown_pid_is_none() {
        let registry = Registry::new();
        assert!(registry.lookup(Pid(7)).is_none());
    }

    #[test]
    fn destroy_detaches_the_table() {
        let mut registry = Registry::new();
        registry.create(Pid(1));
        assert!(registry.destroy(Pid(1)).is_some());
        assert!(registry.lookup(Pid(1)).is_none());
    }

    #[test]
    fn destroy_of_unknown_pid_is_a_noop() {
        let mut registry = Registry::new();
        assert!(registry.destroy(Pid(9)).is_none());
    }
}
