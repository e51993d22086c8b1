//! Unpredictable strings for codes, hashes and nonces

use rand::distributions::{Alphanumeric, DistString};
use rand::Rng;

/// Random ASCII letters and digits
pub fn alphanumeric(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), len)
}

/// Random decimal digits; leading zeros are kept
pub fn digits(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
