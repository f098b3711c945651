use rand::Rng;
use rand::seq::SliceRandom;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Generate a random password with at least one character from each class.
pub fn generate_strong_password(length: usize) -> String {
    let mut rng = rand::rng();
    let all: Vec<u8> = [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS].concat();

    let mut chars = Vec::with_capacity(length);
    for class in [UPPERCASE, LOWERCASE, DIGITS, SYMBOLS] {
        chars.push(class[rng.random_range(0..class.len())]);
    }
    while chars.len() < length {
        chars.push(all[rng.random_range(0..all.len())]);
    }
    chars.shuffle(&mut rng);

    String::from_utf8(chars).expect("password is ascii")
}
