use std::ffi::c_void;

use memtrail::{trail_alloc, trail_alloc_zeroed, trail_free};

fn small_buffer() -> *mut c_void {
    unsafe { trail_alloc!(24) }
}

fn zeroed_table() -> *mut c_void {
    unsafe { trail_alloc_zeroed!(12, 8) }
}

#[memtrail::main]
fn main() {
    let kept = unsafe { trail_alloc!(48) };

    // Both of these are lost: the report should name small_buffer and
    // zeroed_table as the origins.
    let _leak_a = small_buffer();
    let _leak_b = zeroed_table();

    unsafe {
        trail_free!(kept);
    }
}
