#![no_main]

use awkit::Script;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // First byte picks the record separator, the rest is the input stream.
    let Some((&mode, input)) = data.split_first() else {
        return;
    };

    // Limit input sizes to prevent hangs
    if input.len() > 100_000 {
        return;
    }

    let rs = match mode % 4 {
        0 => "\n",
        1 => "",
        2 => ";",
        _ => r"\r?\n|;+",
    };

    let mut script = Script::new();
    script.set_output(std::io::sink());
    if script.set_rs(rs).is_err() {
        return;
    }
    let _ = script.append_rule(None, None);
    let _ = script.run(Cursor::new(input.to_vec()));
});
