/// Hashes a byte string for the hash index.
///
/// This is the small FNV-style mix the key-value server has always used:
/// cheap and deterministic across runs and platforms. Its quality only
/// affects chain lengths, never correctness.
#[must_use]
pub fn str_hash(data: &[u8]) -> u64 {
    let mut h: u32 = 0x811C_9DC5;
    for &byte in data {
        h = h.wrapping_add(u32::from(byte)).wrapping_mul(0x0100_0193);
    }
    u64::from(h)
}
