//! Session identifier generation.
//!
//! IDs are drawn from `rand::thread_rng()`, a ChaCha-based CSPRNG seeded
//! from the OS, so observing issued IDs does not help predict the next one.

use rand::Rng;

/// Length of every session ID minted by the coordinator.
pub const SESSION_ID_LEN: usize = 32;

const DIGITS: &[u8] = b"0123456789";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Character class a generated ID is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Numeric,
    Lowercase,
    Uppercase,
    Alphanumeric,
}

impl Charset {
    fn alphabet(self) -> &'static [u8] {
        match self {
            Charset::Numeric => DIGITS,
            Charset::Lowercase => LOWER,
            Charset::Uppercase => UPPER,
            Charset::Alphanumeric => ALPHANUMERIC,
        }
    }
}

/// Generate a random token of `len` characters from `charset`.
pub fn new_id(len: usize, charset: Charset) -> String {
    let alphabet = charset.alphabet();
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

/// Mint a fresh session ID.
pub fn new_session_id() -> String {
    new_id(SESSION_ID_LEN, Charset::Alphanumeric)
}
