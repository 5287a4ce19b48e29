#![no_main]

use libfuzzer_sys::fuzz_target;
use phebloom::wire;

fuzz_target!(|data: &[u8]| {
    // canonical re-encoding is a fixed point
    if let Ok(value) = wire::decode(data) {
        let encoded = wire::encode(&value).unwrap();
        let again = wire::encode(&wire::decode(&encoded).unwrap()).unwrap();
        assert_eq!(again, encoded);
    }
});
