//! A user-space demand-paging core.
//!
//! [`Pager`] owns a Frame Table, a per-process Page Table Registry, a
//! backing-store [`block::BlockAllocator`], and a second-chance
//! [`replacement::ClockHand`], and drives them through five operations
//! (`create`, `extend`, `fault`, `syslog`, `destroy`) on behalf of a
//! simulator that supplies the other half of the contract: an [`mmu::Mmu`]
//! collaborator.
//!
//! This crate does not simulate an MMU, a disk, or process scheduling
//! itself; those live on the other side of the [`Mmu`] trait. What lives
//! here is the bookkeeping a real kernel's fault handler would do: which
//! pages are resident, which frame backs each one, which frames are
//! reclaimable, and in what order to reclaim them.
//!
//! ```
//! use pager::{Pager, Pid};
//! use pager::mmu_mock::MockMmu;
//!
//! let mmu = MockMmu::new(4, 4, 64);
//! let pager = Pager::new(4, 4, 64, 0, mmu).unwrap();
//!
//! pager.create(Pid(1));
//! let vaddr = pager.extend(Pid(1)).unwrap();
//! pager.fault(Pid(1), vaddr); // demand-zero fill
//! pager.fault(Pid(1), vaddr); // Read -> ReadWrite, page now dirty
//! assert_eq!(pager.resident_count(Pid(1)), 1);
//!
//! pager.destroy(Pid(1));
//! assert_eq!(pager.resident_count(Pid(1)), 0);
//! ```

mod block;
mod error;
mod frame;
mod mmu;
mod page;
mod pager;
mod process_table;
mod prot;
mod replacement;

pub use error::{PagerError, VirtAddr};
pub use frame::{FrameIndex, FrameStats};
pub use mmu::Mmu;
pub use page::{BlockIndex, PageState};
pub use pager::{Pager, PagerStats};
pub use process_table::Pid;
pub use prot::{Prot, RawProt};

pub mod mmu_mock {
    //! Re-export of the in-tree fake MMU, for simulator harnesses and tests
    //! that want a ready-made [`Mmu`](crate::Mmu) without building their own.
    pub use crate::mmu::mock::*;
}
