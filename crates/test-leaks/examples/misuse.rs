use std::ffi::c_void;
use std::ptr;

use memtrail::{trail_alloc, trail_free};

#[memtrail::main]
fn main() {
    unsafe {
        trail_free!(ptr::null_mut());
        trail_free!(0xdead_beef_usize as *mut c_void);

        let p = trail_alloc!(8);
        trail_free!(p);
    }
}
