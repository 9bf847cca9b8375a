use memtrail::trail_alloc;

// Manual mode: no report and no teardown at exit unless asked for.
#[memtrail::main(mode = "manual")]
fn main() {
    unsafe {
        let _leaked = trail_alloc!(64);
    }
    println!("manual mode, nothing requested");
}
