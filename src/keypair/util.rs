// Copyright 2025 Nelson Dominguez
// SPDX-License-Identifier: MIT OR Apache-2.0

use num_bigint_dig::{BigUint, RandPrime};
use num_integer::Integer;
use num_traits::One;
use rand::Rng;

/// Samples a random prime with exactly `bits` bits.
///
/// `RandPrime::gen_prime` sets the two top bits, so the product of two primes
/// of `bits` bits each has exactly `2 * bits` bits.
pub fn generate_prime<R: Rng + ?Sized>(bits: usize, rng: &mut R) -> BigUint {
    rng.gen_prime(bits)
}

/// Carmichael function of `n = pq`: λ = lcm(p - 1, q - 1).
pub fn carmichael_lambda(p: &BigUint, q: &BigUint) -> BigUint {
    let p_minus_1 = p - BigUint::one();
    let q_minus_1 = q - BigUint::one();
    p_minus_1.lcm(&q_minus_1)
}

/// Paillier requires gcd(n, (p - 1)(q - 1)) = 1.
///
/// Always true for equal-size primes, but checked anyway since it is cheap
/// next to prime sampling.
pub fn is_valid_modulus(n: &BigUint, p: &BigUint, q: &BigUint) -> bool {
    let phi = (p - BigUint::one()) * (q - BigUint::one());
    n.gcd(&phi).is_one()
}
