//! The second-chance (clock) replacement engine: picks an eviction victim
//! among the occupied frames, giving referenced pages a second chance
//! before taking one.

use crate::error::VirtAddr;
use crate::frame::{FrameIndex, FrameTable, Occupant};
use crate::mmu::Mmu;
use crate::page::PageState;
use crate::process_table::Registry;
use crate::prot::Prot;

/// The rotating cursor of the clock algorithm.
#[derive(Debug, Default)]
pub struct ClockHand {
    hand: usize,
}

impl ClockHand {
    pub fn new() -> Self {
        Self::default()
    }

    fn advance(&mut self, frame_count: usize) {
        self.hand = (self.hand + 1) % frame_count;
    }

    /// Picks an eviction victim among `frames`' occupied entries, clearing
    /// reference bits and downgrading protection to `None` on every
    /// referenced page it passes over.
    ///
    /// `vaddr_of(pid, index)` reconstructs a page's virtual address so the
    /// downgrade can be reported to the MMU; it exists only because
    /// `base`/`page_size` live one layer up, on [`crate::Pager`].
    ///
    /// Bounded to at most two full revolutions: the first revolution clears
    /// every reference bit it sees, so the second is guaranteed to find a
    /// victim within `frames.len()` further steps.
    ///
    /// # Panics
    /// Panics if no victim is found within two revolutions. This cannot
    /// happen when called correctly (only when every frame is occupied),
    /// and would indicate a frame table / registry bookkeeping bug rather
    /// than a normal runtime condition.
    pub fn select_victim<M: Mmu>(
        &mut self,
        frames: &mut FrameTable,
        registry: &mut Registry,
        mmu: &mut M,
        vaddr_of: impl Fn(usize) -> VirtAddr,
    ) -> FrameIndex {
        let frame_count = frames.len();
        let budget = 2 * frame_count;
        for _ in 0..budget {
            let candidate = self.hand;
            log::trace!("clock hand at frame {candidate}");
            let occupant = frames.get(candidate).occupant();
            let Occupant::Holds { pid, index } = occupant else {
                self.advance(frame_count);
                continue;
            };
            let page = registry
                .lookup_mut(pid)
                .and_then(|table| table.get_mut(index))
                .expect("frame table reverse pointer must resolve");
            debug_assert!(
                matches!(page.state(), PageState::InMemory { frame } if frame == candidate)
            );

            let referenced = frames.get(candidate).referenced() || page.referenced();
            if referenced {
                frames.set_referenced(candidate, false);
                page.set_referenced(false);
                if page.prot() != Prot::None {
                    page.set_prot(Prot::None);
                    mmu.chprot(pid, vaddr_of(index), Prot::None);
                }
                self.advance(frame_count);
                continue;
            }
            log::debug!(
                "frame {candidate} chosen as victim (pid={pid:?} page={index}, write-back={})",
                page.dirty()
            );
            return candidate;
        }
        unreachable!("second-chance must find a victim within two revolutions");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mmu::mock::MockMmu;
    use crate::page::PageEntry;
    use crate::process_table::Pid;

    const PAGE_SIZE: usize = 64;

    fn vaddr_of(index: usize) -> VirtAddr {
        (index * PAGE_SIZE) as VirtAddr
    }

    #[test]
    fn picks_the_only_unreferenced_frame_immediately() {
        let mut frames = FrameTable::new(2);
        let mut registry = Registry::new();
        registry.create(Pid(1));
        let table = registry.lookup_mut(Pid(1)).unwrap();
        table.push(PageEntry::new(0)).unwrap();
        table.push(PageEntry::new(1)).unwrap();
        table.get_mut(0).unwrap().mark_resident(0, Prot::Read);
        table.get_mut(1).unwrap().mark_resident(1, Prot::Read);
        frames.bind(0, Pid(1), 0);
        frames.bind(1, Pid(1), 1);
        // Frame 1's page is referenced, frame 0's is not.
        table.get_mut(1).unwrap().set_referenced(true);
        frames.set_referenced(1, true);

        let mut mmu = MockMmu::new(2, 2, PAGE_SIZE);
        let mut hand = ClockHand::new();
        let victim = hand.select_victim(&mut frames, &mut registry, &mut mmu, vaddr_of);
        assert_eq!(victim, 0);
    }

    #[test]
    fn referenced_frame_is_spared_once_then_taken() {
        let mut frames = FrameTable::new(1);
        let mut registry = Registry::new();
        registry.create(Pid(1));
        let table = registry.lookup_mut(Pid(1)).unwrap();
        table.push(PageEntry::new(0)).unwrap();
        table.get_mut(0).unwrap().mark_resident(0, Prot::Read);
        frames.bind(0, Pid(1), 0);
        table.get_mut(0).unwrap().set_referenced(true);
        frames.set_referenced(0, true);

        let mut mmu = MockMmu::new(1, 1, PAGE_SIZE);
        let mut hand = ClockHand::new();
        let victim = hand.select_victim(&mut frames, &mut registry, &mut mmu, vaddr_of);
        assert_eq!(victim, 0);
        // The reference bit was cleared and prot downgraded on the way past.
        assert_eq!(mmu.calls.chprot, 1);
        assert_eq!(
            registry.lookup(Pid(1)).unwrap().get(0).unwrap().prot(),
            Prot::None
        );
    }
}
