//! Per-page bookkeeping.

use crate::frame::FrameIndex;
use crate::prot::Prot;

/// Index of a backing-store block.
pub type BlockIndex = usize;

/// The residency state of one virtual page.
///
/// Variants carry only the data that is meaningful in that state: there is
/// no `frame == -1` sentinel, and `has_disk_copy` only exists while the
/// page actually has a disk shadow to speak of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Allocated but never touched: no frame, no meaningful disk contents.
    Uninitialized,
    /// Not resident. `has_disk_copy` is true iff the backing block holds
    /// data that must be read back on reload.
    OnDisk { has_disk_copy: bool },
    /// Resident in `frame`; that frame's reverse pointer points back here.
    InMemory { frame: FrameIndex },
}

/// One virtual page belonging to one process.
#[derive(Debug, Clone)]
pub struct PageEntry {
    state: PageState,
    disk_block: BlockIndex,
    prot: Prot,
    referenced: bool,
    dirty: bool,
}

impl PageEntry {
    /// Creates a freshly `extend`ed page entry owning `disk_block`.
    pub(crate) fn new(disk_block: BlockIndex) -> Self {
        Self {
            state: PageState::Uninitialized,
            disk_block,
            prot: Prot::None,
            referenced: false,
            dirty: false,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn disk_block(&self) -> BlockIndex {
        self.disk_block
    }

    pub fn prot(&self) -> Prot {
        self.prot
    }

    pub fn referenced(&self) -> bool {
        self.referenced
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_resident(&self) -> bool {
        matches!(self.state, PageState::InMemory { .. })
    }

    pub(crate) fn set_referenced(&mut self, value: bool) {
        self.referenced = value;
    }

    pub(crate) fn set_prot(&mut self, prot: Prot) {
        self.prot = prot;
    }

    pub(crate) fn set_dirty(&mut self, value: bool) {
        self.dirty = value;
    }

    /// Transitions to `InMemory { frame }`, mapped at `prot`, with
    /// `referenced` set.
    pub(crate) fn mark_resident(&mut self, frame: FrameIndex, prot: Prot) {
        self.state = PageState::InMemory { frame };
        self.prot = prot;
        self.referenced = true;
    }

    /// Transitions to `OnDisk { has_disk_copy }` and clears residency-only
    /// fields.
    pub(crate) fn mark_evicted(&mut self, has_disk_copy: bool) {
        self.state = PageState::OnDisk { has_disk_copy };
        self.prot = Prot::None;
        self.referenced = false;
        self.dirty = false;
    }
}
