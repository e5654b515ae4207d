//! Random values for generated defaults.

use rand::seq::SliceRandom;

/// Length of generated names.
pub const DEFAULT_NAME_LENGTH: usize = 8;

const ASCII_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A string of `length` upper/lower-case ASCII letters.
pub fn random_name_of(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .filter_map(|_| ASCII_LETTERS.choose(&mut rng))
        .map(|&b| b as char)
        .collect()
}

/// An 8-letter random name.
pub fn random_name() -> String {
    random_name_of(DEFAULT_NAME_LENGTH)
}
