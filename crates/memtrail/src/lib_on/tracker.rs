use std::ffi::c_void;

use crate::origin::Origin;
use crate::output::LeakReport;

use super::ledger::Ledger;

/// The four primitives of the underlying platform allocator.
///
/// [`AllocTracker`] performs every real acquisition and release through this
/// seam. The default [`SystemHeap`] delegates to libc; tests plug in a
/// scripted heap to exercise failure and relocation paths.
pub trait Heap: Send {
    /// # Safety
    ///
    /// Same contract as `malloc(3)`.
    unsafe fn alloc(&self, size: usize) -> *mut c_void;

    /// # Safety
    ///
    /// Same contract as `calloc(3)`.
    unsafe fn alloc_zeroed(&self, count: usize, size: usize) -> *mut c_void;

    /// # Safety
    ///
    /// Same contract as `realloc(3)`: `ptr` must be null or a live block
    /// previously returned by this heap.
    unsafe fn realloc(&self, ptr: *mut c_void, new_size: usize) -> *mut c_void;

    /// # Safety
    ///
    /// Same contract as `free(3)`.
    unsafe fn free(&self, ptr: *mut c_void);
}

/// Platform allocator: libc `malloc`/`calloc`/`realloc`/`free`.
#[derive(Debug, Default)]
pub struct SystemHeap;

impl Heap for SystemHeap {
    unsafe fn alloc(&self, size: usize) -> *mut c_void {
        unsafe { libc::malloc(size) }
    }

    unsafe fn alloc_zeroed(&self, count: usize, size: usize) -> *mut c_void {
        unsafe { libc::calloc(count, size) }
    }

    unsafe fn realloc(&self, ptr: *mut c_void, new_size: usize) -> *mut c_void {
        unsafe { libc::realloc(ptr, new_size) }
    }

    unsafe fn free(&self, ptr: *mut c_void) {
        unsafe { libc::free(ptr) }
    }
}

/// What [`AllocTracker::free`] did with the pointer it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    /// The block was tracked; its record was removed and the memory released.
    Released,
    /// Null pointer: diagnostic printed, nothing released.
    NullPointer,
    /// Address absent from the ledger: diagnostic printed, release skipped.
    Untracked,
}

/// The instance-based tracking core: a [`Ledger`] plus the heap it fronts.
///
/// The process-wide `tracked_*` functions are a thin convenience wrapper
/// around one of these behind a mutex; everything interesting lives here and
/// is testable in isolation.
pub struct AllocTracker {
    ledger: Ledger,
    heap: Box<dyn Heap>,
}

impl AllocTracker {
    pub fn new() -> Self {
        Self::with_heap(Box::new(SystemHeap))
    }

    pub fn with_heap(heap: Box<dyn Heap>) -> Self {
        Self {
            ledger: Ledger::new(),
            heap,
        }
    }

    /// Allocates `size` bytes and records the block. On failure returns null
    /// and leaves the ledger untouched.
    ///
    /// # Safety
    ///
    /// Same contract as `malloc(3)`; release the result through
    /// [`free`](Self::free) or [`realloc`](Self::realloc) on this tracker.
    pub unsafe fn alloc(&mut self, size: usize, origin: Origin) -> *mut c_void {
        let ptr = unsafe { self.heap.alloc(size) };
        if !ptr.is_null() {
            self.ledger.append(ptr as usize, size, origin);
        }
        ptr
    }

    /// Allocates a zero-initialized array of `count` elements of `size`
    /// bytes. Tracked like any other allocation, so these blocks show up in
    /// the leak report too.
    ///
    /// # Safety
    ///
    /// Same contract as `calloc(3)`.
    pub unsafe fn alloc_zeroed(&mut self, count: usize, size: usize, origin: Origin) -> *mut c_void {
        let ptr = unsafe { self.heap.alloc_zeroed(count, size) };
        if !ptr.is_null() {
            self.ledger.append(ptr as usize, count.saturating_mul(size), origin);
        }
        ptr
    }

    /// Resizes a block, re-keying its record to the (possibly relocated)
    /// resulting address. On failure returns null and leaves the ledger
    /// untouched, so the original block stays tracked at its old address.
    /// An untracked `ptr` is tolerated: the resulting block is simply
    /// tracked from here on.
    ///
    /// # Safety
    ///
    /// Same contract as `realloc(3)`.
    pub unsafe fn realloc(&mut self, ptr: *mut c_void, new_size: usize, origin: Origin) -> *mut c_void {
        let new_ptr = unsafe { self.heap.realloc(ptr, new_size) };
        if new_ptr.is_null() {
            return std::ptr::null_mut();
        }
        self.ledger.remove(ptr as usize);
        self.ledger.append(new_ptr as usize, new_size, origin);
        new_ptr
    }

    /// Releases a tracked block. Misuse is non-fatal: a diagnostic line is
    /// printed and the real release is skipped, keeping the ledger
    /// consistent either way.
    ///
    /// # Safety
    ///
    /// `ptr` must be null, a live block from this tracker, or an address
    /// that this tracker has never handed out (which is reported as an
    /// invalid free and otherwise ignored).
    pub unsafe fn free(&mut self, ptr: *mut c_void, origin: Origin) -> FreeOutcome {
        if ptr.is_null() {
            println!("Free NULL pointer: {origin}");
            return FreeOutcome::NullPointer;
        }
        match self.ledger.remove(ptr as usize) {
            Some(_) => {
                unsafe { self.heap.free(ptr) };
                FreeOutcome::Released
            }
            None => {
                println!("Invalid free at 0x{:08x}.", ptr as usize);
                FreeOutcome::Untracked
            }
        }
    }

    pub fn live_blocks(&self) -> usize {
        self.ledger.len()
    }

    pub fn live_bytes(&self) -> usize {
        self.ledger.records().iter().map(|r| r.size()).sum()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Snapshot of everything still unreleased.
    pub fn report(&self) -> LeakReport {
        self.ledger.snapshot()
    }
}

impl Default for AllocTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AllocTracker {
    /// Best-effort cleanup: every block still tracked is force-released
    /// before the bookkeeping goes away.
    fn drop(&mut self) {
        for record in self.ledger.drain() {
            unsafe { self.heap.free(record.address() as *mut c_void) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct HeapLog {
        frees: AtomicUsize,
        fail_alloc: AtomicBool,
        fail_realloc: AtomicBool,
    }

    /// Real libc underneath, but with switchable failures and an optional
    /// "always relocate on realloc" mode.
    struct ScriptedHeap {
        log: Arc<HeapLog>,
        force_move: bool,
    }

    impl ScriptedHeap {
        fn tracker(force_move: bool) -> (AllocTracker, Arc<HeapLog>) {
            let log = Arc::new(HeapLog::default());
            let heap = ScriptedHeap {
                log: Arc::clone(&log),
                force_move,
            };
            (AllocTracker::with_heap(Box::new(heap)), log)
        }
    }

    impl Heap for ScriptedHeap {
        unsafe fn alloc(&self, size: usize) -> *mut c_void {
            if self.log.fail_alloc.load(Ordering::Relaxed) {
                return std::ptr::null_mut();
            }
            unsafe { libc::malloc(size) }
        }

        unsafe fn alloc_zeroed(&self, count: usize, size: usize) -> *mut c_void {
            if self.log.fail_alloc.load(Ordering::Relaxed) {
                return std::ptr::null_mut();
            }
            unsafe { libc::calloc(count, size) }
        }

        unsafe fn realloc(&self, ptr: *mut c_void, new_size: usize) -> *mut c_void {
            if self.log.fail_realloc.load(Ordering::Relaxed) {
                return std::ptr::null_mut();
            }
            if self.force_move {
                // Allocate the replacement while the old block is still
                // live, guaranteeing a different address.
                let fresh = unsafe { libc::malloc(new_size) };
                if !fresh.is_null() && !ptr.is_null() {
                    unsafe { libc::free(ptr) };
                }
                fresh
            } else {
                unsafe { libc::realloc(ptr, new_size) }
            }
        }

        unsafe fn free(&self, ptr: *mut c_void) {
            self.log.frees.fetch_add(1, Ordering::Relaxed);
            unsafe { libc::free(ptr) }
        }
    }

    fn origin(function: &'static str, line: u32) -> Origin {
        Origin::new(function, "src/lib_on/tracker.rs", line)
    }

    #[test]
    fn round_trip_reports_all_clear() {
        let (mut tracker, _) = ScriptedHeap::tracker(false);
        unsafe {
            let a = tracker.alloc(16, origin("round_trip", 1));
            let b = tracker.alloc(32, origin("round_trip", 2));
            let c = tracker.alloc(64, origin("round_trip", 3));
            // Free out of insertion order.
            assert_eq!(tracker.free(b, origin("round_trip", 4)), FreeOutcome::Released);
            assert_eq!(tracker.free(c, origin("round_trip", 5)), FreeOutcome::Released);
            assert_eq!(tracker.free(a, origin("round_trip", 6)), FreeOutcome::Released);
        }
        assert_eq!(tracker.live_blocks(), 0);
        assert_eq!(tracker.report().to_string(), "All blocks were freed");
    }

    #[test]
    fn unfreed_blocks_are_reported_with_their_origins() {
        let (mut tracker, _) = ScriptedHeap::tracker(false);
        let (a, c) = unsafe {
            let a = tracker.alloc(24, origin("site_a", 10));
            let b = tracker.alloc(48, origin("site_b", 20));
            let c = tracker.alloc(96, origin("site_c", 30));
            tracker.free(b, origin("site_b", 21));
            (a, c)
        };

        let report = tracker.report();
        assert_eq!(report.leaked_blocks(), 2);
        assert_eq!(report.leaked_bytes(), 120);

        let text = report.to_string();
        assert!(text.contains(&format!("24 byte(s) lost at 0x{:08x}: site_a", a as usize)));
        assert!(text.contains(&format!("96 byte(s) lost at 0x{:08x}: site_c", c as usize)));
        assert!(text.ends_with("2 block(s) hasn't been freed"));

        unsafe {
            tracker.free(a, origin("site_a", 11));
            tracker.free(c, origin("site_c", 31));
        }
    }

    #[test]
    fn failed_alloc_leaves_no_record() {
        let (mut tracker, log) = ScriptedHeap::tracker(false);
        log.fail_alloc.store(true, Ordering::Relaxed);

        let ptr = unsafe { tracker.alloc(16, origin("failing", 1)) };
        assert!(ptr.is_null());
        assert_eq!(tracker.live_blocks(), 0);
    }

    #[test]
    fn zeroed_alloc_is_tracked() {
        let (mut tracker, _) = ScriptedHeap::tracker(false);
        let ptr = unsafe { tracker.alloc_zeroed(4, 8, origin("zeroed", 1)) };
        assert!(!ptr.is_null());
        assert_eq!(tracker.live_blocks(), 1);
        assert_eq!(tracker.live_bytes(), 32);
        unsafe { tracker.free(ptr, origin("zeroed", 2)) };
    }

    #[test]
    fn null_free_is_a_diagnosed_no_op() {
        let (mut tracker, log) = ScriptedHeap::tracker(false);
        let outcome = unsafe { tracker.free(std::ptr::null_mut(), origin("nuller", 1)) };
        assert_eq!(outcome, FreeOutcome::NullPointer);
        assert_eq!(log.frees.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn invalid_free_skips_release_and_keeps_ledger() {
        let (mut tracker, log) = ScriptedHeap::tracker(false);
        let ptr = unsafe { tracker.alloc(16, origin("valid", 1)) };

        let bogus = 0xdead_beef_usize as *mut c_void;
        let outcome = unsafe { tracker.free(bogus, origin("bogus", 2)) };
        assert_eq!(outcome, FreeOutcome::Untracked);
        assert_eq!(tracker.live_blocks(), 1);
        assert_eq!(log.frees.load(Ordering::Relaxed), 0);

        unsafe { tracker.free(ptr, origin("valid", 3)) };
    }

    #[test]
    fn realloc_rekeys_to_relocated_address() {
        let (mut tracker, _) = ScriptedHeap::tracker(true);
        unsafe {
            let old = tracker.alloc(16, origin("grower", 1));
            let new = tracker.realloc(old, 64, origin("grower", 2));
            assert!(!new.is_null());
            assert_ne!(old, new);
            assert_eq!(tracker.live_blocks(), 1);
            assert!(tracker.ledger().contains(new as usize));
            assert!(!tracker.ledger().contains(old as usize));

            // Freeing the returned address must succeed.
            assert_eq!(tracker.free(new, origin("grower", 3)), FreeOutcome::Released);
        }
        assert!(tracker.report().is_clean());
    }

    #[test]
    fn failed_realloc_returns_null_and_keeps_old_record() {
        let (mut tracker, log) = ScriptedHeap::tracker(false);
        let ptr = unsafe { tracker.alloc(16, origin("stuck", 1)) };

        log.fail_realloc.store(true, Ordering::Relaxed);
        let result = unsafe { tracker.realloc(ptr, 4096, origin("stuck", 2)) };
        assert!(result.is_null());
        assert_eq!(tracker.live_blocks(), 1);
        assert!(tracker.ledger().contains(ptr as usize));
        assert_eq!(tracker.ledger().records()[0].size(), 16);

        log.fail_realloc.store(false, Ordering::Relaxed);
        unsafe { tracker.free(ptr, origin("stuck", 3)) };
    }

    #[test]
    fn untracked_realloc_is_tolerated_and_tracked_afterwards() {
        let (mut tracker, _) = ScriptedHeap::tracker(false);
        // realloc(NULL, n) behaves like malloc(n).
        let ptr = unsafe { tracker.realloc(std::ptr::null_mut(), 32, origin("fresh", 1)) };
        assert!(!ptr.is_null());
        assert_eq!(tracker.live_blocks(), 1);
        unsafe { tracker.free(ptr, origin("fresh", 2)) };
    }

    #[test]
    fn drop_force_releases_remaining_blocks() {
        let (mut tracker, log) = ScriptedHeap::tracker(false);
        unsafe {
            tracker.alloc(8, origin("lost", 1));
            tracker.alloc(16, origin("lost", 2));
            tracker.alloc(24, origin("lost", 3));
        }
        assert_eq!(tracker.live_blocks(), 3);

        drop(tracker);
        assert_eq!(log.frees.load(Ordering::Relaxed), 3);
    }
}
