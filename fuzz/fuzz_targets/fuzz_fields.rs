#![no_main]

use awkit::{Action, Script};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // First byte picks the field-splitting mode, the rest is the input.
    let Some((&mode, input)) = data.split_first() else {
        return;
    };

    if input.len() > 100_000 {
        return;
    }

    let mut script = Script::new();
    script.set_output(std::io::sink());
    match mode % 5 {
        0 => script.set_fs(" "),
        1 => script.set_fs(""),
        2 => script.set_fs(","),
        3 => script.set_fs("[-:]+"),
        _ => {
            let _ = script.set_field_widths(&[1, 3, 7]);
        }
    }
    let _ = script.append_rule(
        None,
        Some(Action::new(|s| {
            for i in 0..=s.nf() {
                let _ = s.field(i).int();
            }
            Ok(())
        })),
    );
    let _ = script.run(Cursor::new(input.to_vec()));
});
