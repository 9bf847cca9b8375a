use std::ffi::c_void;

use memtrail::{trail_alloc, trail_free};

fn grab(size: usize) -> *mut c_void {
    unsafe { trail_alloc!(size) }
}

#[memtrail::main]
fn main() {
    let a = grab(16);
    let b = grab(32);
    let c = unsafe { trail_alloc!(64) };

    unsafe {
        trail_free!(b);
        trail_free!(a);
        trail_free!(c);
    }
}
