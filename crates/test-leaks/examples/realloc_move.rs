use memtrail::{trail_alloc, trail_free, trail_realloc};

#[memtrail::main]
fn main() {
    unsafe {
        let p = trail_alloc!(16);
        let q = trail_realloc!(p, 64 * 1024);
        assert!(!q.is_null());

        // The record was re-keyed, so freeing the returned address works
        // whether or not the block moved.
        trail_free!(q);
    }
}
