use rand::{rngs::OsRng, Rng, RngCore};

/// Generate an opaque random token of `bytes` bytes, hex encoded.
pub fn generate_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Generate a numeric one-time code of exactly `digits` ASCII digits.
///
/// Leading zeros are kept, so every code in `0..10^digits` is possible.
pub fn generate_numeric_code(digits: usize) -> String {
    let mut rng = OsRng;
    (0..digits)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
