use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const PUBLIC_ID_LEN: usize = 12;

/// Short URL-safe identifier handed to clients in place of the content identifier.
pub fn public_id() -> String {
    let mut rng = rand::rng();
    (0..PUBLIC_ID_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
