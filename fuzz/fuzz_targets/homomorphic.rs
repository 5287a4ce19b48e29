#![no_main]

use libfuzzer_sys::fuzz_target;
use num_bigint_dig::BigUint;
use phebloom::{Decrypt, Encrypt, HomomorphicAdd, KeyPair, Paillier};

use std::sync::OnceLock;

static PAILLIER: OnceLock<Paillier> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    let paillier = PAILLIER.get_or_init(|| Paillier::from_keypair(&KeyPair::generate_with_size(512).unwrap()));
    let n = paillier.public_key().n();

    let (m1_bytes, m2_bytes) = data.split_at(data.len() / 2);
    let m1 = BigUint::from_bytes_be(m1_bytes) % n;
    let m2 = BigUint::from_bytes_be(m2_bytes) % n;

    let c1 = paillier.encrypt(&m1).unwrap();
    let c2 = paillier.encrypt(&m2).unwrap();
    let sum = paillier.add(&c1, &c2);

    assert_eq!(paillier.decrypt(&sum).unwrap(), (m1 + m2) % n);
});
