pub use memtrail_macros::main;

use std::ffi::c_void;

use thiserror::Error;

use crate::origin::Origin;
use crate::output::{LeakReport, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Automatic,
    Manual,
}

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("allocation tracking was already torn down")]
    Destroyed,
    #[error("allocation tracking state is poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    Released,
    NullPointer,
    Untracked,
}

pub fn set_mode(_mode: Mode) {}

pub fn mode() -> Mode {
    Mode::Automatic
}

pub fn init() -> Result<(), TrailError> {
    Ok(())
}

pub fn teardown() {}

pub fn report() {}

pub fn report_with(_reporter: &dyn Reporter) {}

pub fn leak_report() -> Option<LeakReport> {
    None
}

/// # Safety
///
/// Same contract as `malloc(3)`.
pub unsafe fn tracked_alloc(size: usize, _origin: Origin) -> *mut c_void {
    unsafe { libc::malloc(size) }
}

/// # Safety
///
/// Same contract as `calloc(3)`.
pub unsafe fn tracked_alloc_zeroed(count: usize, size: usize, _origin: Origin) -> *mut c_void {
    unsafe { libc::calloc(count, size) }
}

/// # Safety
///
/// Same contract as `realloc(3)`.
pub unsafe fn tracked_realloc(ptr: *mut c_void, new_size: usize, _origin: Origin) -> *mut c_void {
    unsafe { libc::realloc(ptr, new_size) }
}

/// # Safety
///
/// Same contract as `free(3)`.
pub unsafe fn tracked_free(ptr: *mut c_void, _origin: Origin) -> FreeOutcome {
    if ptr.is_null() {
        return FreeOutcome::NullPointer;
    }
    unsafe { libc::free(ptr) };
    FreeOutcome::Released
}

pub struct GuardBuilder {}

impl GuardBuilder {
    pub fn new() -> Self {
        Self {}
    }

    pub fn mode(self, _mode: Mode) -> Self {
        self
    }

    pub fn reporter(self, _reporter: Box<dyn Reporter>) -> Self {
        self
    }

    pub fn build(self) -> TrailGuard {
        TrailGuard {}
    }
}

impl Default for GuardBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct TrailGuard {}
