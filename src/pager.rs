//! [`Pager`], the mutex-guarded aggregate exposing the core's public
//! operations.
//!
//! One owned `Pager` object the caller constructs once and calls methods
//! on, all serialized behind a single `std::sync::Mutex` rather than a
//! file-scope singleton: callers here are ordinary OS threads, not
//! interrupt handlers, so there is no need for a spinlock.

use std::sync::Mutex;

use crate::block::BlockAllocator;
use crate::error::{PagerError, VirtAddr};
use crate::frame::{FrameStats, FrameTable, Occupant};
use crate::mmu::Mmu;
use crate::page::{PageEntry, PageState};
use crate::process_table::{Pid, Registry};
use crate::prot::Prot;
use crate::replacement::ClockHand;

/// Read-only occupancy snapshot across all of the pager's resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PagerStats {
    pub frames: FrameStats,
    pub blocks_free: usize,
    pub blocks_total: usize,
    pub process_count: usize,
}

struct Inner<M: Mmu> {
    frames: FrameTable,
    blocks: BlockAllocator,
    registry: Registry,
    clock: ClockHand,
    mmu: M,
}

/// The demand-paging core, generic over the injected MMU collaborator `M`.
///
/// All public operations take `&self` and serialize on one internal mutex:
/// the type is `Send + Sync` as long as `M: Send`, so a simulator harness
/// can share one `Pager` across however many threads drive fault delivery
/// for however many processes.
pub struct Pager<M: Mmu> {
    page_size: usize,
    base: VirtAddr,
    inner: Mutex<Inner<M>>,
}

impl<M: Mmu> Pager<M> {
    /// Builds a pager over `frames` physical frames and `blocks`
    /// backing-store blocks, with `page_size`/`base` and the `mmu`
    /// collaborator supplied as configuration rather than hardcoded
    /// platform constants.
    ///
    /// Intended to be called exactly once per simulated address-space
    /// universe; nothing prevents constructing more than one `Pager`, but
    /// doing so gives each its own independent frame/block pool.
    pub fn new(
        frames: usize,
        blocks: usize,
        page_size: usize,
        base: VirtAddr,
        mmu: M,
    ) -> Result<Self, PagerError> {
        if frames == 0 {
            return Err(PagerError::invalid_argument(0..0, "frame count must be nonzero"));
        }
        if blocks == 0 {
            return Err(PagerError::invalid_argument(0..0, "block count must be nonzero"));
        }
        if page_size == 0 || !page_size.is_power_of_two() {
            return Err(PagerError::invalid_argument(
                0..0,
                "page size must be a nonzero power of two",
            ));
        }
        log::info!(
            "pager initialized: frames={frames} blocks={blocks} page_size={page_size} base={base:#x}"
        );
        Ok(Self {
            page_size,
            base,
            inner: Mutex::new(Inner {
                frames: FrameTable::new(frames),
                blocks: BlockAllocator::new(blocks),
                registry: Registry::new(),
                clock: ClockHand::new(),
                mmu,
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<M>> {
        self.inner.lock().expect("pager mutex poisoned by a prior panic")
    }

    fn vaddr(&self, index: usize) -> VirtAddr {
        self.base + index as u64 * self.page_size as u64
    }

    /// Registers a new process with an empty address space.
    pub fn create(&self, pid: Pid) {
        let mut guard = self.lock();
        guard.registry.create(pid);
        log::info!("pid={pid:?} created");
    }

    /// Appends one page to `pid`'s address space, returning its virtual
    /// address.
    ///
    /// Fails with [`PagerError::InvalidArgument`] if `pid` is not
    /// registered, the one public operation here reachable directly from
    /// a caller-supplied pid that a caller could plausibly get wrong.
    pub fn extend(&self, pid: Pid) -> Result<VirtAddr, PagerError> {
        let mut guard = self.lock();
        let Inner { registry, blocks, .. } = &mut *guard;
        let Some(table) = registry.lookup_mut(pid) else {
            log::debug!("pid={pid:?} extend: not registered");
            return Err(PagerError::invalid_argument(0..0, "extend called for unregistered pid"));
        };

        let new_index = table.page_count();
        let block = blocks.allocate()?;
        if let Err(err) = table.push(PageEntry::new(block)) {
            blocks.release(block);
            return Err(err);
        }

        let vaddr = self.vaddr(new_index);
        log::info!("pid={pid:?} extend -> page {new_index} at {vaddr:#x} (block {block})");
        Ok(vaddr)
    }

    /// The fault handler state machine.
    ///
    /// Faults for an unknown `pid` or an out-of-range page index are
    /// silently ignored: the core has no signalling channel for them and
    /// trusts the collaborator never delivers one.
    pub fn fault(&self, pid: Pid, addr: VirtAddr) {
        log::trace!("pid={pid:?} fault addr={addr:#x}");
        let mut guard = self.lock();
        let Inner { frames, registry, clock, mmu, .. } = &mut *guard;

        let Some(idx) = page_index(self.base, self.page_size, registry, pid, addr) else {
            log::trace!(
                "pid={pid:?} fault addr={addr:#x} ignored: unknown pid or index out of range"
            );
            return;
        };
        let vaddr = self.vaddr(idx);

        let state = registry.lookup(pid).unwrap().get(idx).unwrap().state();
        match state {
            PageState::InMemory { frame } => {
                // Case A: protection fault on an already-resident page.
                let page = registry.lookup_mut(pid).unwrap().get_mut(idx).unwrap();
                page.set_referenced(true);
                frames.set_referenced(frame, true);
                match page.prot() {
                    Prot::None => {
                        page.set_prot(Prot::Read);
                        mmu.chprot(pid, vaddr, Prot::Read);
                        log::debug!("pid={pid:?} page={idx} protection fault: None -> Read");
                    }
                    Prot::Read => {
                        page.set_prot(Prot::ReadWrite);
                        page.set_dirty(true);
                        mmu.chprot(pid, vaddr, Prot::ReadWrite);
                        log::debug!(
                            "pid={pid:?} page={idx} protection fault: Read -> ReadWrite (dirty)"
                        );
                    }
                    Prot::ReadWrite => {
                        log::trace!("pid={pid:?} page={idx} spurious fault (already Read+Write)");
                    }
                }
            }
            PageState::Uninitialized | PageState::OnDisk { .. } => {
                // Case B: residency fault.
                load_page(self.base, self.page_size, frames, registry, clock, mmu, pid, idx);
            }
        }
    }

    /// Forces residency for every page touched by `[addr, addr+len)`, then
    /// hex-dumps the underlying physical bytes.
    ///
    /// Returns the rendered dump (the Rust analogue of a `0` return with
    /// output already emitted) or [`PagerError::InvalidArgument`] (the
    /// analogue of `-1`) if `[addr, addr+len)` is not entirely within
    /// `pid`'s allocated virtual range.
    pub fn syslog(&self, pid: Pid, addr: VirtAddr, len: usize) -> Result<String, PagerError> {
        let mut guard = self.lock();
        let Inner { frames, registry, clock, mmu, .. } = &mut *guard;

        let page_count = registry.lookup(pid).map_or(0, |t| t.page_count());
        let end_addr = self.base + page_count as u64 * self.page_size as u64;
        let end = addr
            .checked_add(len as u64)
            .ok_or_else(|| PagerError::invalid_argument(addr..addr, "range overflows address space"))?;
        if addr < self.base || end > end_addr {
            return Err(PagerError::invalid_argument(
                addr..end,
                "syslog range outside process's allocated pages",
            ));
        }

        let mut out = String::with_capacity(len * 2 + 1);
        for offset in 0..len as u64 {
            let byte_addr = addr + offset;
            let idx = ((byte_addr - self.base) / self.page_size as u64) as usize;

            let frame = match registry.lookup(pid).unwrap().get(idx).unwrap().state() {
                PageState::InMemory { frame } => {
                    let page = registry.lookup_mut(pid).unwrap().get_mut(idx).unwrap();
                    page.set_referenced(true);
                    frames.set_referenced(frame, true);
                    frame
                }
                _ => load_page(self.base, self.page_size, frames, registry, clock, mmu, pid, idx),
            };

            let page_offset = (byte_addr - self.base) % self.page_size as u64;
            let phys_index = frame * self.page_size + page_offset as usize;
            let byte = mmu.physical_memory()[phys_index];
            out.push_str(&format!("{byte:02x}"));
        }
        out.push('\n');
        log::debug!("pid={pid:?} syslog [{addr:#x}, {end:#x}) -> {} bytes", len);
        Ok(out)
    }

    /// Releases every frame and block the process owns, without writing
    /// back dirty pages, then drops its table. A no-op for an
    /// unregistered `pid`.
    pub fn destroy(&self, pid: Pid) {
        let mut guard = self.lock();
        let Inner { frames, blocks, registry, .. } = &mut *guard;
        let Some(table) = registry.destroy(pid) else {
            log::trace!("pid={pid:?} destroy: not registered, no-op");
            return;
        };
        for page in table.iter() {
            if let PageState::InMemory { frame } = page.state() {
                frames.unbind(frame);
            }
            blocks.release(page.disk_block());
        }
        log::info!("pid={pid:?} destroyed: released {} pages", table.page_count());
    }

    /// Read-only resource snapshot.
    pub fn stats(&self) -> PagerStats {
        let guard = self.lock();
        PagerStats {
            frames: guard.frames.stats(),
            blocks_free: guard.blocks.free_count(),
            blocks_total: guard.blocks.total(),
            process_count: guard.registry.process_count(),
        }
    }

    /// Number of currently resident pages for one process. Never exceeds
    /// the total frame count, since residency always goes through the
    /// frame table.
    pub fn resident_count(&self, pid: Pid) -> usize {
        let guard = self.lock();
        guard
            .registry
            .lookup(pid)
            .map_or(0, |table| table.iter().filter(|p| p.is_resident()).count())
    }

    /// Runs `f` against the MMU collaborator under the pager's own lock.
    ///
    /// `Pager` owns its `M` outright, so there is no other way to reach it
    /// from outside; this is the hook a test or a simulator harness uses to
    /// inspect collaborator-side state (e.g. a
    /// [`MockMmu`](crate::mmu_mock::MockMmu)'s call counts or mapped
    /// frames) after driving the pager.
    pub fn with_mmu<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        let guard = self.lock();
        f(&guard.mmu)
    }

    /// As [`Pager::with_mmu`], but with mutable access — the hook a test
    /// uses to poke collaborator-owned state (e.g. writing bytes into a
    /// [`MockMmu`](crate::mmu_mock::MockMmu)'s physical memory to simulate
    /// a process write) in between driving calls into the pager.
    pub fn with_mmu_mut<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard.mmu)
    }
}

/// Computes the page index `addr` falls in for `pid`, or `None` if `pid` is
/// unknown, `addr` precedes `base`, or the index is out of range.
fn page_index(
    base: VirtAddr,
    page_size: usize,
    registry: &Registry,
    pid: Pid,
    addr: VirtAddr,
) -> Option<usize> {
    if addr < base {
        return None;
    }
    let idx = ((addr - base) / page_size as u64) as usize;
    let table = registry.lookup(pid)?;
    (idx < table.page_count()).then_some(idx)
}

/// Brings a non-resident page in: acquires a frame (evicting if necessary),
/// materializes its contents, and maps it read-only.
///
/// Shared by [`Pager::fault`]'s residency-fault path and [`Pager::syslog`]'s
/// forced-residency step, since both need exactly this procedure.
fn load_page<M: Mmu>(
    base: VirtAddr,
    page_size: usize,
    frames: &mut FrameTable,
    registry: &mut Registry,
    clock: &mut ClockHand,
    mmu: &mut M,
    pid: Pid,
    idx: usize,
) -> usize {
    let vaddr_of = move |i: usize| base + i as u64 * page_size as u64;
    let prior_state = registry.lookup(pid).unwrap().get(idx).unwrap().state();

    let frame = match frames.find_free() {
        Some(f) => f,
        None => {
            let victim = clock.select_victim(frames, registry, mmu, vaddr_of);
            evict(victim, frames, registry, mmu, vaddr_of);
            victim
        }
    };
    frames.bind(frame, pid, idx);

    let page = registry.lookup_mut(pid).unwrap().get_mut(idx).unwrap();
    match prior_state {
        PageState::OnDisk { has_disk_copy: true } => {
            mmu.disk_read(page.disk_block(), frame);
            log::debug!("pid={pid:?} page={idx} loaded from disk block {}", page.disk_block());
        }
        _ => {
            mmu.zero_fill(frame);
            log::debug!("pid={pid:?} page={idx} demand-zeroed into frame {frame}");
        }
    }
    page.set_dirty(false);
    page.mark_resident(frame, Prot::Read);
    mmu.resident(pid, vaddr_of(idx), frame, Prot::Read);
    frame
}

/// Evicts the occupant of `frame`: tells the MMU the mapping is gone, writes
/// back if dirty, and unbinds the frame. `nonresident` is issued before
/// `disk_write` so no process can ever observe a resident mapping to a
/// frame mid-rewrite.
fn evict<M: Mmu>(
    frame: usize,
    frames: &mut FrameTable,
    registry: &mut Registry,
    mmu: &mut M,
    vaddr_of: impl Fn(usize) -> VirtAddr,
) {
    let Occupant::Holds { pid, index } = frames.get(frame).occupant() else {
        unreachable!("evicting a free frame");
    };
    mmu.nonresident(pid, vaddr_of(index));

    let page = registry
        .lookup_mut(pid)
        .and_then(|t| t.get_mut(index))
        .expect("frame table reverse pointer must resolve");
    if page.dirty() {
        mmu.disk_write(frame, page.disk_block());
        page.mark_evicted(true);
        log::debug!("pid={pid:?} page={index} evicted dirty -> disk block {}", page.disk_block());
    } else {
        page.mark_evicted(false);
        log::debug!("pid={pid:?} page={index} evicted clean, no writeback");
    }
    frames.unbind(frame);
}
