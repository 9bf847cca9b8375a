//! Transparent allocation tracking for programs that manage memory through
//! the four classic primitives (`malloc`, `calloc`, `realloc`, `free`).
//! Every outstanding allocation is recorded with its size and call site;
//! on demand or when the lifecycle guard drops, the blocks that were never
//! released are printed in a human-readable leak report.
//!
//! All real memory comes from and returns to the platform allocator -
//! memtrail is a debugging aid, not an allocator. Enable the
//! `memtrail-off` feature to compile every wrapper down to a plain
//! pass-through with no tracking.

#[cfg(not(feature = "memtrail-off"))]
#[doc(inline)]
pub use lib_on::*;
#[cfg(not(feature = "memtrail-off"))]
mod lib_on;

pub(crate) mod origin;
pub use origin::Origin;

#[allow(dead_code)]
pub(crate) mod output;
pub use output::{ConsoleReporter, LeakRecord, LeakReport, Reporter};

// When tracking is disabled with the memtrail-off feature the same surface
// is served by lib_off, where every wrapper is a plain pass-through.
#[cfg(feature = "memtrail-off")]
#[doc(inline)]
pub use lib_off::*;
#[cfg(feature = "memtrail-off")]
mod lib_off;

/// Allocates through [`tracked_alloc`], capturing the call site
/// automatically: `unsafe { trail_alloc!(64) }`.
#[macro_export]
macro_rules! trail_alloc {
    ($size:expr) => {
        $crate::tracked_alloc($size, $crate::origin!())
    };
}

/// Zero-initialized allocation through [`tracked_alloc_zeroed`]:
/// `unsafe { trail_alloc_zeroed!(count, size) }`.
#[macro_export]
macro_rules! trail_alloc_zeroed {
    ($count:expr, $size:expr) => {
        $crate::tracked_alloc_zeroed($count, $size, $crate::origin!())
    };
}

/// Resizes through [`tracked_realloc`]:
/// `unsafe { trail_realloc!(ptr, new_size) }`.
#[macro_export]
macro_rules! trail_realloc {
    ($ptr:expr, $new_size:expr) => {
        $crate::tracked_realloc($ptr, $new_size, $crate::origin!())
    };
}

/// Releases through [`tracked_free`]: `unsafe { trail_free!(ptr) }`.
#[macro_export]
macro_rules! trail_free {
    ($ptr:expr) => {
        $crate::tracked_free($ptr, $crate::origin!())
    };
}
