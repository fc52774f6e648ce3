#![no_main]

use awkit::Script;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if text.len() > 10_000 {
        return;
    }

    // Every projection of a string value must be computable without
    // panicking, and the string projection must round-trip.
    let script = Script::new();
    let v = script.new_value(text);
    let _ = v.int();
    let _ = v.float();
    assert_eq!(v.string(), text);

    // Cross-projection caching from the numeric side.
    let n = script.new_value(v.float());
    let _ = n.int();
    let _ = n.string();
});
