//! The XOR-keystream cipher and its three fixed call-sites.
//!
//! All three are involutions: applying the same call with the same region
//! and seed a second time restores the original bytes. None of them
//! allocate beyond the fresh RNG they construct per call.
use crate::rng::{CrtRng, LehmerRng};

/// The 46-byte key guarding the PAK/IDX directory.
pub const INDEX_KEY: &[u8] = b"1qaz2wsx3edc4rfv5tgb6yhn7ujm8ik,9ol.0p;/-@:^[]";

/// The 12-byte key shared by the DAT script-body and GR graphics ciphers.
pub const EAGLS_KEY: &[u8] = b"EAGLS_SYSTEM";

/// `0x174B`, the logical-to-actual offset adjustment used throughout the
/// PAK container.
pub const PAK_OFFSET_ADJUST: u64 = 0x174B;

fn xor_crt(buf: &mut [u8], key: &[u8], seed: u32, start: usize, end: usize, stride: usize) {
    let mut rng = CrtRng::new(seed);
    let mut i = start;
    while i < end {
        let v = rng.next() as usize;
        buf[i] ^= key[v % key.len()];
        i += stride;
    }
}

fn xor_lehmer(buf: &mut [u8], key: &[u8], seed: u32, start: usize, end: usize, stride: usize) {
    let mut rng = LehmerRng::new(seed);
    let mut i = start;
    while i < end {
        let v = rng.next() as usize;
        buf[i] ^= key[v % key.len()];
        i += stride;
    }
}

/// **A.** The PAK/IDX directory cipher: CRT-RNG, [`INDEX_KEY`], seeded from
/// the directory's own trailing 4-byte word, applied over `[0, total - 4)`
/// with stride 1. The caller is responsible for setting the trailer's first
/// byte to `0x60` before the first (encrypting) application; see
/// [`crate::pak`].
pub fn directory_cipher(buf: &mut [u8]) {
    let total = buf.len();
    assert!(total >= 4, "directory buffer shorter than its own trailer");
    let seed = u32::from_le_bytes([
        buf[total - 4],
        buf[total - 3],
        buf[total - 2],
        buf[total - 1],
    ]);
    xor_crt(buf, INDEX_KEY, seed, 0, total - 4, 1);
}

/// **B.** The DAT script-body cipher: CRT-RNG, [`EAGLS_KEY`], seeded from
/// the buffer's last byte (sign-extended), applied over `[3600, total - 2)`
/// with stride 2. A no-op when `total <= 3602`.
pub fn script_body_cipher(buf: &mut [u8]) {
    let total = buf.len();
    if total <= 3602 {
        return;
    }
    let seed_byte = buf[total - 1] as i8;
    let seed = (seed_byte as i32) as u32;
    xor_crt(buf, EAGLS_KEY, seed, 3600, total - 2, 2);
}

/// **C.** The GR graphics cipher: Lehmer-RNG, [`EAGLS_KEY`], seeded from the
/// buffer's last byte (widened unsigned), applied over
/// `[0, min(total - 1, 0x174B))` with stride 1.
pub fn graphics_cipher(buf: &mut [u8]) {
    let total = buf.len();
    if total == 0 {
        return;
    }
    let seed = buf[total - 1] as u32;
    let end = (total - 1).min(0x174B);
    xor_lehmer(buf, EAGLS_KEY, seed, 0, end, 1);
}
