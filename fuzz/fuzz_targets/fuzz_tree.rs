#![no_main]
use libfuzzer_sys::fuzz_target;
use wbxml_tree::parser::{parse_bytes_with_options, ParseOptions};

fuzz_target!(|data: &[u8]| {
    // Default options: DevInf elision and CDATA recovery on
    let _ = parse_bytes_with_options(data, &ParseOptions::default());
    // Plain tree building, nothing elided or recovered
    let plain = ParseOptions::default()
        .elidable_tags(Vec::<String>::new())
        .recover_cdata(false);
    let _ = parse_bytes_with_options(data, &plain);
    // Every SyncML container elided, with a shallow embedding limit
    let nested = ParseOptions::default()
        .elidable_tags(["DevInf", "Item", "Data"])
        .max_embed_depth(3);
    let _ = parse_bytes_with_options(data, &nested);
});
