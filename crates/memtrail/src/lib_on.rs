pub use memtrail_macros::main;

pub mod ledger;
mod tracker;

pub use ledger::{Ledger, Record};
pub use tracker::{AllocTracker, FreeOutcome, Heap, SystemHeap};

use std::ffi::c_void;
use std::sync::Mutex;

use thiserror::Error;

use crate::origin::Origin;
use crate::output::{ConsoleReporter, LeakReport, Reporter};

/// When ledger teardown and the final leak report happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Dropping the lifecycle guard prints the report and destroys the
    /// ledger.
    #[default]
    Automatic,
    /// The caller drives [`report`] and [`teardown`] explicitly; nothing
    /// happens at exit.
    Manual,
}

#[derive(Debug, Error)]
pub enum TrailError {
    /// The ledger was torn down; tracking cannot be re-initialized in this
    /// process.
    #[error("allocation tracking was already torn down")]
    Destroyed,
    /// The process-wide tracking state was poisoned by a panic.
    #[error("allocation tracking state is poisoned")]
    Poisoned,
}

enum Phase {
    Uninitialized,
    Active(AllocTracker),
    Destroyed,
}

struct Shared {
    mode: Mode,
    phase: Phase,
}

// The process-wide convenience layer. One mutex guards every ledger
// mutation; the instance-based AllocTracker stays single-threaded.
static SHARED: Mutex<Shared> = Mutex::new(Shared {
    mode: Mode::Automatic,
    phase: Phase::Uninitialized,
});

/// Selects the process-wide working mode. Intended to be called before the
/// first tracked allocation; existing records are unaffected.
pub fn set_mode(mode: Mode) {
    if let Ok(mut shared) = SHARED.lock() {
        shared.mode = mode;
    }
}

/// The current process-wide working mode.
pub fn mode() -> Mode {
    SHARED.lock().map(|shared| shared.mode).unwrap_or_default()
}

/// Creates the process-wide ledger if it does not exist yet. Idempotent
/// while tracking is active; rejected once [`teardown`] has run.
pub fn init() -> Result<(), TrailError> {
    let mut shared = SHARED.lock().map_err(|_| TrailError::Poisoned)?;
    match shared.phase {
        Phase::Uninitialized => {
            shared.phase = Phase::Active(AllocTracker::new());
            Ok(())
        }
        Phase::Active(_) => Ok(()),
        Phase::Destroyed => Err(TrailError::Destroyed),
    }
}

/// Destroys the process-wide ledger, force-releasing any blocks still
/// tracked. In automatic mode the leak report is printed first; in manual
/// mode reporting stays the caller's job. No-op unless tracking is active.
pub fn teardown() {
    teardown_with(&ConsoleReporter);
}

fn teardown_with(reporter: &dyn Reporter) {
    let Ok(mut shared) = SHARED.lock() else {
        return;
    };
    let Phase::Active(tracker) = &shared.phase else {
        return;
    };
    if shared.mode == Mode::Automatic {
        if let Err(e) = reporter.report(&tracker.report()) {
            eprintln!("memtrail: failed to report leaks: {e}");
        }
    }
    // Dropping the active tracker force-releases whatever is left.
    shared.phase = Phase::Destroyed;
}

/// Prints the leak report without tearing anything down. Usable mid-run in
/// automatic mode or as the explicit report in manual mode. No-op unless
/// tracking is active.
pub fn report() {
    report_with(&ConsoleReporter);
}

/// Like [`report`], but through a caller-supplied [`Reporter`].
pub fn report_with(reporter: &dyn Reporter) {
    if let Some(snapshot) = leak_report() {
        if let Err(e) = reporter.report(&snapshot) {
            eprintln!("memtrail: failed to report leaks: {e}");
        }
    }
}

/// Programmatic snapshot of currently tracked blocks, if tracking is
/// active.
pub fn leak_report() -> Option<LeakReport> {
    let shared = SHARED.lock().ok()?;
    match &shared.phase {
        Phase::Active(tracker) => Some(tracker.report()),
        _ => None,
    }
}

/// Runs `f` against the process-wide tracker, lazily creating it on first
/// use. After teardown (or under a poisoned mutex) tracking is gone for
/// good and `fallback` runs instead: the allocation surface must keep
/// working, just untracked.
fn with_tracker<R>(f: impl FnOnce(&mut AllocTracker) -> R, fallback: impl FnOnce() -> R) -> R {
    let Ok(mut shared) = SHARED.lock() else {
        return fallback();
    };
    if matches!(shared.phase, Phase::Uninitialized) {
        shared.phase = Phase::Active(AllocTracker::new());
    }
    match &mut shared.phase {
        Phase::Active(tracker) => f(tracker),
        _ => fallback(),
    }
}

/// Tracked counterpart of `malloc(3)`.
///
/// # Safety
///
/// Same contract as `malloc(3)`; release the result through
/// [`tracked_free`] or [`tracked_realloc`], not other deallocation APIs.
pub unsafe fn tracked_alloc(size: usize, origin: Origin) -> *mut c_void {
    with_tracker(
        |tracker| unsafe { tracker.alloc(size, origin) },
        || unsafe { libc::malloc(size) },
    )
}

/// Tracked counterpart of `calloc(3)`.
///
/// # Safety
///
/// Same contract as `calloc(3)`.
pub unsafe fn tracked_alloc_zeroed(count: usize, size: usize, origin: Origin) -> *mut c_void {
    with_tracker(
        |tracker| unsafe { tracker.alloc_zeroed(count, size, origin) },
        || unsafe { libc::calloc(count, size) },
    )
}

/// Tracked counterpart of `realloc(3)`. Returns null on failure and leaves
/// the ledger (and the original block) untouched.
///
/// # Safety
///
/// Same contract as `realloc(3)`.
pub unsafe fn tracked_realloc(ptr: *mut c_void, new_size: usize, origin: Origin) -> *mut c_void {
    with_tracker(
        |tracker| unsafe { tracker.realloc(ptr, new_size, origin) },
        || unsafe { libc::realloc(ptr, new_size) },
    )
}

/// Tracked counterpart of `free(3)`. Misuse (null pointer, address never
/// handed out) prints a diagnostic and skips the real release.
///
/// # Safety
///
/// `ptr` must be null or a pointer obtained from the tracked allocation
/// functions. Blocks still tracked at [`teardown`] are force-released then;
/// passing such a pointer here afterwards is a double free, since the
/// post-teardown path releases unconditionally.
pub unsafe fn tracked_free(ptr: *mut c_void, origin: Origin) -> FreeOutcome {
    with_tracker(
        |tracker| unsafe { tracker.free(ptr, origin) },
        || {
            if ptr.is_null() {
                return FreeOutcome::NullPointer;
            }
            unsafe { libc::free(ptr) };
            FreeOutcome::Released
        },
    )
}

/// Builder for the lifecycle guard that replaces an exit hook: dropping the
/// built [`TrailGuard`] runs teardown and, in automatic mode, the final
/// report.
///
/// ```no_run
/// use memtrail::{GuardBuilder, Mode};
///
/// let _guard = GuardBuilder::new().mode(Mode::Automatic).build();
/// // Tracked allocations here; report prints when _guard goes out of scope.
/// ```
pub struct GuardBuilder {
    mode: Mode,
    reporter: Box<dyn Reporter>,
}

impl GuardBuilder {
    pub fn new() -> Self {
        Self {
            mode: Mode::Automatic,
            reporter: Box::new(ConsoleReporter),
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Routes the final report through a custom [`Reporter`] instead of
    /// stdout.
    pub fn reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Sets the mode, initializes tracking and returns the guard.
    pub fn build(self) -> TrailGuard {
        set_mode(self.mode);
        if let Err(e) = init() {
            eprintln!("memtrail: {e}");
        }
        TrailGuard {
            reporter: self.reporter,
        }
    }
}

impl Default for GuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scope guard for the tracking lifecycle, normally installed by
/// [`#[memtrail::main]`](macro@main). On drop in automatic mode it prints the
/// leak report and destroys the ledger; in manual mode it leaves both to
/// the caller.
pub struct TrailGuard {
    reporter: Box<dyn Reporter>,
}

impl Drop for TrailGuard {
    fn drop(&mut self) {
        if mode() == Mode::Automatic {
            teardown_with(self.reporter.as_ref());
        }
    }
}
