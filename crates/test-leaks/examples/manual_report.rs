use memtrail::{trail_alloc, trail_free, TrailError};

#[memtrail::main(mode = "manual")]
fn main() {
    unsafe {
        let p = trail_alloc!(40);

        // Mid-run report: one live block.
        memtrail::report();

        trail_free!(p);
    }

    // Everything was returned; report once more, then tear down.
    memtrail::report();
    memtrail::teardown();

    // Teardown is terminal: tracking cannot come back in this process.
    assert!(matches!(memtrail::init(), Err(TrailError::Destroyed)));
    println!("init rejected after teardown");
}
