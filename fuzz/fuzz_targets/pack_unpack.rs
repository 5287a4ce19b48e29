#![no_main]

use libfuzzer_sys::fuzz_target;
use phebloom::PackingLayout;

fuzz_target!(|data: &[u8]| {
    let Some((&params, values)) = data.split_first() else {
        return;
    };
    let field_width = usize::from(params % 16) + 1;
    let slots = usize::from(params >> 4) + 1;
    let Ok(layout) = PackingLayout::with_slots(field_width, slots) else {
        return;
    };

    let values: Vec<u64> = values.iter().map(|&b| u64::from(b) & layout.capacity()).collect();
    let packed = layout.pack(&values).unwrap();
    assert_eq!(packed.len(), layout.packs_for(values.len()));

    let mut unpacked = Vec::new();
    for x in &packed {
        unpacked.extend(layout.unpack(x).unwrap());
    }
    unpacked.truncate(values.len());
    assert_eq!(unpacked, values);
});
