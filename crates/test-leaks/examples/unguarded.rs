use memtrail::{trail_alloc, trail_free, Mode};

// No guard and no explicit init: the first tracked allocation creates the
// ledger on its own.
fn main() {
    memtrail::set_mode(Mode::Manual);

    unsafe {
        let p = trail_alloc!(56);

        // One live block, tracked despite the missing init.
        memtrail::report();

        trail_free!(p);
    }

    memtrail::report();
}
