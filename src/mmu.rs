//! The MMU collaborator contract and a real-but-small fake implementation
//! of it for tests.
//!
//! This is explicitly out of the pager's own scope: the core only depends
//! on the six primitives below and a read-only physical memory handle,
//! expressed as a trait so any simulator harness can supply its own
//! collaborator instead of a hardwired hardware binding.

use crate::error::VirtAddr;
use crate::frame::FrameIndex;
use crate::page::BlockIndex;
use crate::process_table::Pid;
use crate::prot::Prot;

/// The operations the pager needs from the MMU.
///
/// Calls are synchronous and non-suspending from the pager's perspective:
/// they happen while the pager's mutex is held, so an implementation must
/// not block on anything that could deadlock against another call into
/// the same [`crate::Pager`].
pub trait Mmu: Send {
    /// Fills `frame` with zero bytes.
    fn zero_fill(&mut self, frame: FrameIndex);

    /// Copies `block`'s contents into `frame`.
    fn disk_read(&mut self, block: BlockIndex, frame: FrameIndex);

    /// Copies `frame`'s contents into `block`.
    fn disk_write(&mut self, frame: FrameIndex, block: BlockIndex);

    /// Installs a page-table mapping for `pid` at `vaddr`, backed by `frame`,
    /// with protection `prot`.
    fn resident(&mut self, pid: Pid, vaddr: VirtAddr, frame: FrameIndex, prot: Prot);

    /// Removes the mapping for `pid` at `vaddr`.
    fn nonresident(&mut self, pid: Pid, vaddr: VirtAddr);

    /// Changes the protection of an existing mapping for `pid` at `vaddr`.
    fn chprot(&mut self, pid: Pid, vaddr: VirtAddr, prot: Prot);

    /// A byte-addressable, read-only handle to the entire physical memory,
    /// indexable as `frame * page_size + offset`, used by
    /// [`Pager::syslog`](crate::Pager::syslog).
    fn physical_memory(&self) -> &[u8];
}

pub mod mock {
    //! A real in-process fake MMU: owns physical memory and a backing
    //! store, and records call counts so tests can assert on exactly which
    //! primitives fired.
    //!
    //! [`Pager`](crate::Pager) takes its `Mmu` collaborator by value, so a
    //! test that wants to inspect call counts or physical memory after
    //! driving the pager reaches it through [`Pager::with_mmu`](crate::Pager::with_mmu)
    //! rather than holding its own handle.

    use std::collections::HashMap;

    use super::Mmu;
    use crate::error::VirtAddr;
    use crate::frame::FrameIndex;
    use crate::page::BlockIndex;
    use crate::process_table::Pid;
    use crate::prot::Prot;

    /// Per-primitive call counters, keyed by the frame or block touched.
    #[derive(Debug, Default, Clone)]
    pub struct CallCounts {
        pub zero_fill: HashMap<FrameIndex, usize>,
        pub disk_read: HashMap<BlockIndex, usize>,
        pub disk_write: HashMap<BlockIndex, usize>,
        pub resident: usize,
        pub nonresident: usize,
        pub chprot: usize,
    }

    /// A fake MMU backing [`crate::Pager`] in tests: real physical memory,
    /// a real backing store, and a live map of (pid, vaddr) -> (frame, prot)
    /// mirroring what a real page table would contain.
    pub struct MockMmu {
        page_size: usize,
        physical: Vec<u8>,
        disk: Vec<u8>,
        mappings: HashMap<(Pid, VirtAddr), (FrameIndex, Prot)>,
        pub calls: CallCounts,
    }

    impl MockMmu {
        pub fn new(frames: usize, blocks: usize, page_size: usize) -> Self {
            Self {
                page_size,
                physical: vec![0; frames * page_size],
                disk: vec![0; blocks * page_size],
                mappings: HashMap::new(),
                calls: CallCounts::default(),
            }
        }

        fn frame_range(&self, frame: FrameIndex) -> std::ops::Range<usize> {
            let start = frame * self.page_size;
            start..start + self.page_size
        }

        fn block_range(&self, block: BlockIndex) -> std::ops::Range<usize> {
            let start = block * self.page_size;
            start..start + self.page_size
        }

        /// Writes `data` at the start of `frame`'s physical memory.
        /// Test-only helper for simulating a process write.
        pub fn write_frame(&mut self, frame: FrameIndex, data: &[u8]) {
            let range = self.frame_range(frame);
            self.physical[range][..data.len()].copy_from_slice(data);
        }

        /// Reads the first `len` bytes of `frame`'s physical memory.
        pub fn read_frame(&self, frame: FrameIndex, len: usize) -> &[u8] {
            &self.physical[self.frame_range(frame)][..len]
        }

        /// The current mapping for `(pid, vaddr)`, if the mock believes the
        /// page is resident.
        pub fn mapping(&self, pid: Pid, vaddr: VirtAddr) -> Option<(FrameIndex, Prot)> {
            self.mappings.get(&(pid, vaddr)).copied()
        }
    }

    impl Mmu for MockMmu {
        fn zero_fill(&mut self, frame: FrameIndex) {
            let range = self.frame_range(frame);
            self.physical[range].fill(0);
            *self.calls.zero_fill.entry(frame).or_default() += 1;
        }

        fn disk_read(&mut self, block: BlockIndex, frame: FrameIndex) {
            let block_range = self.block_range(block);
            let data = self.disk[block_range].to_vec();
            let frame_range = self.frame_range(frame);
            self.physical[frame_range].copy_from_slice(&data);
            *self.calls.disk_read.entry(block).or_default() += 1;
        }

        fn disk_write(&mut self, frame: FrameIndex, block: BlockIndex) {
            let frame_range = self.frame_range(frame);
            let data = self.physical[frame_range].to_vec();
            let block_range = self.block_range(block);
            self.disk[block_range].copy_from_slice(&data);
            *self.calls.disk_write.entry(block).or_default() += 1;
        }

        fn resident(&mut self, pid: Pid, vaddr: VirtAddr, frame: FrameIndex, prot: Prot) {
            self.mappings.insert((pid, vaddr), (frame, prot));
            self.calls.resident += 1;
        }

        fn nonresident(&mut self, pid: Pid, vaddr: VirtAddr) {
            self.mappings.remove(&(pid, vaddr));
            self.calls.nonresident += 1;
        }

        fn chprot(&mut self, pid: Pid, vaddr: VirtAddr, prot: Prot) {
            if let Some(entry) = self.mappings.get_mut(&(pid, vaddr)) {
                entry.1 = prot;
            }
            self.calls.chprot += 1;
        }

        fn physical_memory(&self) -> &[u8] {
            &self.physical
        }
    }
}
