//! Error kinds surfaced by the public [`crate::Pager`] operations.

use std::ops::Range;

use thiserror::Error;

/// A single virtual address, in the collaborator's flat address space.
pub type VirtAddr = u64;

/// Everything that can go wrong calling into the pager.
///
/// Faults on unknown pids or out-of-range indices are **not** represented
/// here: the collaborator contract is that such faults never happen, so
/// [`crate::Pager::fault`] silently ignores them instead of returning an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PagerError {
    /// The backing-store block pool is exhausted.
    #[error("no free backing-store block available")]
    NoSpace,

    /// A `syslog` range fell outside the process's allocated virtual range,
    /// or a `Pager::new` parameter was out of its valid domain.
    #[error("invalid argument: range {range:?} ({reason})")]
    InvalidArgument {
        /// The offending range, in bytes.
        range: Range<VirtAddr>,
        /// A short human-readable reason.
        reason: &'static str,
    },

    /// Internal bookkeeping allocation (page-table growth, registry entry)
    /// failed, typically because the host is out of memory.
    #[error("internal allocation failed: {reason}")]
    AllocationFailure {
        /// A short human-readable reason.
        reason: &'static str,
    },
}

impl PagerError {
    pub(crate) fn invalid_argument(range: Range<VirtAddr>, reason: &'static str) -> Self {
        Self::InvalidArgument { range, reason }
    }
}
