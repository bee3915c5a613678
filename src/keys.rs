//! Short-key generation over the lowercase base36 alphabet.

use rand::Rng;

const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a random key of `length` characters, uniform per character.
///
/// No collision check is performed; a colliding key silently overwrites the
/// prior record, which is the accepted semantics for short paste handles.
pub fn generate_key(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_requested_length() {
        assert_eq!(generate_key(6).len(), 6);
        assert_eq!(generate_key(32).len(), 32);
    }

    #[test]
    fn stays_within_base36_alphabet() {
        let key = generate_key(512);
        assert!(key.bytes().all(|b| KEY_ALPHABET.contains(&b)));
    }
}
