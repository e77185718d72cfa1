//! End-to-end scenarios driven entirely through the public `Pager` API
//! against the in-tree `MockMmu` fake.

use pager::mmu_mock::MockMmu;
use pager::{Pager, PagerError, Pid, Prot};

const PAGE_SIZE: usize = 4096;
const BASE: u64 = 0x1_0000;

fn new_pager(frames: usize, blocks: usize) -> Pager<MockMmu> {
    Pager::new(frames, blocks, PAGE_SIZE, BASE, MockMmu::new(frames, blocks, PAGE_SIZE)).unwrap()
}

/// F=2, B=4, page_size=4096, base=BASE, walking through a sequence of
/// scenarios where each one's precondition is the last one's postcondition.
#[test]
fn full_lifecycle_matches_spec_scenarios() {
    let _ = env_logger::try_init();
    let pager = new_pager(2, 4);

    // 1. Single process demand-zero.
    pager.create(Pid(1));
    let a = pager.extend(Pid(1)).unwrap();
    assert_eq!(a, BASE);

    pager.fault(Pid(1), a);
    assert_eq!(pager.resident_count(Pid(1)), 1);
    pager.with_mmu(|mmu| {
        let (frame, prot) = mmu.mapping(Pid(1), a).unwrap();
        assert_eq!(prot, Prot::Read);
        assert!(mmu.read_frame(frame, 4).iter().all(|&byte| byte == 0));
    });

    // 2. Write sets dirty: a second fault on an already-Read page is the
    // stand-in for "the process just wrote to it".
    pager.fault(Pid(1), a);
    pager.with_mmu(|mmu| {
        let (_, prot) = mmu.mapping(Pid(1), a).unwrap();
        assert_eq!(prot, Prot::ReadWrite);
        assert_eq!(mmu.calls.chprot, 1);
    });

    let b = pager.extend(Pid(1)).unwrap();
    let c = pager.extend(Pid(1)).unwrap();
    pager.fault(Pid(1), b);
    assert_eq!(pager.resident_count(Pid(1)), 2);

    // 3. Eviction writeback: both frames are taken, so faulting in `c`
    // forces the replacement engine to evict. `a` is dirty and is the one
    // the clock lands on.
    pager.fault(Pid(1), c);
    assert_eq!(pager.resident_count(Pid(1)), 2); // b and c, a went to disk
    pager.with_mmu(|mmu| {
        assert_eq!(mmu.calls.disk_write.len(), 1, "exactly one block written back");
        assert_eq!(mmu.calls.disk_write.values().sum::<usize>(), 1);
        assert!(mmu.mapping(Pid(1), a).is_none(), "evicted page has no mapping");
    });

    // 4. Reload from disk: `a` comes back, via disk_read, not zero_fill.
    pager.fault(Pid(1), a);
    pager.with_mmu(|mmu| {
        assert_eq!(mmu.calls.disk_read.len(), 1, "exactly one block reloaded");
        assert_eq!(mmu.calls.disk_read.values().sum::<usize>(), 1);
        let (_, prot) = mmu.mapping(Pid(1), a).unwrap();
        assert_eq!(prot, Prot::Read);
    });

    // 5. Clean eviction skips writeback: this fault evicts whichever of
    // `b`/`c` the clock lands on next; neither was ever written, so no
    // further disk_write should ever happen, and getting it back in must
    // go through zero_fill rather than disk_read.
    pager.fault(Pid(1), b);
    pager.with_mmu(|mmu| {
        // Still exactly the one disk_write/disk_read from steps 3 and 4:
        // every eviction and reload since has been clean / demand-zero.
        assert_eq!(mmu.calls.disk_write.values().sum::<usize>(), 1);
        assert_eq!(mmu.calls.disk_read.values().sum::<usize>(), 1);
        let (_, prot) = mmu.mapping(Pid(1), b).unwrap();
        assert_eq!(prot, Prot::Read);
    });
}

/// 6. Destroy releases all: every block and frame the process held becomes
/// available again, and a fresh process can claim the whole pool.
#[test]
fn destroy_releases_all_resources_for_reuse() {
    let pager = new_pager(2, 4);
    pager.create(Pid(1));
    for _ in 0..4 {
        pager.extend(Pid(1)).unwrap();
    }
    assert_eq!(pager.stats().blocks_free, 0);

    pager.destroy(Pid(1));
    let stats = pager.stats();
    assert_eq!(stats.blocks_free, 4);
    assert_eq!(stats.frames.free, 2);
    assert_eq!(stats.process_count, 0);

    pager.create(Pid(2));
    for _ in 0..4 {
        pager.extend(Pid(2)).unwrap();
    }
}

#[test]
fn destroy_then_recreate_reuses_the_same_first_address() {
    let pager = new_pager(2, 4);
    pager.create(Pid(1));
    let first = pager.extend(Pid(1)).unwrap();

    pager.destroy(Pid(1));
    pager.create(Pid(1));
    let second = pager.extend(Pid(1)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn extend_fails_with_no_space_past_the_block_pool() {
    let pager = new_pager(1, 2);
    pager.create(Pid(1));
    pager.extend(Pid(1)).unwrap();
    pager.extend(Pid(1)).unwrap();
    assert_eq!(pager.extend(Pid(1)), Err(PagerError::NoSpace));
}

#[test]
fn syslog_boundary_succeeds_then_fails_one_byte_past() {
    let pager = new_pager(1, 1);
    pager.create(Pid(1));
    pager.extend(Pid(1)).unwrap();
    let last_page_end = BASE + PAGE_SIZE as u64;

    let dump = pager.syslog(Pid(1), last_page_end - 1, 1).unwrap();
    assert_eq!(dump, "00\n");

    assert!(matches!(
        pager.syslog(Pid(1), last_page_end, 1),
        Err(PagerError::InvalidArgument { .. })
    ));
}

#[test]
fn syslog_forces_residency_and_reads_written_bytes() {
    let pager = new_pager(1, 1);
    pager.create(Pid(1));
    let a = pager.extend(Pid(1)).unwrap();

    // No fault has happened yet; syslog must bring the page in itself.
    assert_eq!(pager.resident_count(Pid(1)), 0);
    let dump = pager.syslog(Pid(1), a, 2).unwrap();
    assert_eq!(dump, "0000\n");
    assert_eq!(pager.resident_count(Pid(1)), 1);

    pager.with_mmu(|mmu| {
        let (_, prot) = mmu.mapping(Pid(1), a).unwrap();
        assert_eq!(prot, Prot::Read);
    });
}

/// write(v, x); force_evict(v); read(v) == x: a dirty page's contents
/// survive a writeback-then-reload round trip through the backing store.
#[test]
fn eviction_writeback_round_trip_recovers_written_bytes() {
    let pager = new_pager(1, 2);
    pager.create(Pid(1));
    let a = pager.extend(Pid(1)).unwrap();
    let b = pager.extend(Pid(1)).unwrap();

    pager.fault(Pid(1), a); // demand-zero fill, resident at Read
    pager.fault(Pid(1), a); // Read -> ReadWrite, page now dirty

    let written = [0xAB, 0xCD, 0xEF, 0x12];
    pager.with_mmu_mut(|mmu| {
        let (frame, _) = mmu.mapping(Pid(1), a).unwrap();
        mmu.write_frame(frame, &written);
    });

    // Only one frame exists; faulting in `b` forces eviction of `a`, with a
    // write-back since the fault above left it dirty.
    pager.fault(Pid(1), b);
    pager.with_mmu(|mmu| {
        assert!(mmu.mapping(Pid(1), a).is_none(), "a was evicted");
        assert_eq!(mmu.calls.disk_write.values().sum::<usize>(), 1);
    });

    // Faulting `a` back in reloads it from disk, not zero_fill.
    pager.fault(Pid(1), a);
    pager.with_mmu(|mmu| {
        let (frame, _) = mmu.mapping(Pid(1), a).unwrap();
        assert_eq!(mmu.read_frame(frame, written.len()), &written[..]);
    });
}

#[test]
fn extend_on_unregistered_pid_is_an_error_not_a_panic() {
    let pager = new_pager(1, 1);
    assert!(matches!(
        pager.extend(Pid(1)),
        Err(PagerError::InvalidArgument { .. })
    ));
}

#[test]
fn pager_new_rejects_invalid_configuration() {
    assert!(matches!(
        Pager::new(0, 1, PAGE_SIZE, BASE, MockMmu::new(0, 1, PAGE_SIZE)),
        Err(PagerError::InvalidArgument { .. })
    ));
    assert!(matches!(
        Pager::new(1, 0, PAGE_SIZE, BASE, MockMmu::new(1, 0, PAGE_SIZE)),
        Err(PagerError::InvalidArgument { .. })
    ));
    assert!(matches!(
        Pager::new(1, 1, 3000, BASE, MockMmu::new(1, 1, 3000)),
        Err(PagerError::InvalidArgument { .. })
    ));
    assert!(Pager::new(1, 1, PAGE_SIZE, BASE, MockMmu::new(1, 1, PAGE_SIZE)).is_ok());
}
