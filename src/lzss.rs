//! The sliding-window LZSS codec wrapping `.gr` graphics payloads.
//!
//! Output is a sequence of groups of up to 8 items, each preceded by a flag
//! byte whose bit `7 - k` tells whether item `k` is a literal (1) or a
//! match-code (0). This mirrors the original engine's compressor bit for
//! bit; decoding tolerates damaged match offsets by skipping them rather
//! than aborting, since real-world graphics occasionally trip this.
use anyhow::Result;

const THRESHOLD: usize = 2;

/// Compresses `data` using a sliding window parameterized by `pre_bits`
/// (lookahead width; `window_bits = 16 - pre_bits`).
pub fn encode(data: &[u8], pre_bits: u32) -> Result<Vec<u8>> {
    anyhow::ensure!((4..=14).contains(&pre_bits), "pre_bits out of range: {pre_bits}");
    let window_bits = 16 - pre_bits;
    let pre_size = ((1usize << pre_bits) - 1) + THRESHOLD;
    let window_size = ((1usize << window_bits) - 1) + THRESHOLD;

    let mut out = Vec::new();
    let mut window: Vec<u8> = Vec::with_capacity(window_size);
    let mut pos = 0usize;
    let mut lookahead: Vec<u8> = data[..data.len().min(pre_size)].to_vec();
    pos += lookahead.len();

    let mut flag = 0u8;
    let mut item_count = 0u32;
    let mut payload: Vec<u8> = Vec::with_capacity(16);

    while !lookahead.is_empty() {
        let (best_len, best_off) = find_longest_match(&window, &lookahead, pre_size);

        if best_len >= THRESHOLD {
            let code = ((best_off as u16) << pre_bits) | (best_len - THRESHOLD) as u16;
            payload.push((code & 0xFF) as u8);
            payload.push(((code >> 8) & 0xFF) as u8);
            append_to_window(&mut window, &lookahead[..best_len], window_size);
            lookahead.drain(..best_len);
        } else {
            flag |= 1 << (7 - item_count);
            payload.push(lookahead[0]);
            append_to_window(&mut window, &lookahead[..1], window_size);
            lookahead.drain(..1);
        }
        item_count += 1;

        while lookahead.len() < pre_size && pos < data.len() {
            lookahead.push(data[pos]);
            pos += 1;
        }

        if item_count == 8 {
            out.push(flag);
            out.extend_from_slice(&payload);
            flag = 0;
            item_count = 0;
            payload.clear();
        }
    }
    if item_count > 0 {
        out.push(flag);
        out.extend_from_slice(&payload);
    }
    Ok(out)
}

/// Finds the longest run of `lookahead` (at least [`THRESHOLD`] bytes, at
/// most `pre_size`) that occurs as a contiguous substring of `window`,
/// first-fit (lowest offset) on ties.
fn find_longest_match(window: &[u8], lookahead: &[u8], pre_size: usize) -> (usize, usize) {
    let max_len = lookahead.len().min(pre_size);
    if max_len < THRESHOLD || window.is_empty() {
        return (0, 0);
    }
    let mut best_len = 0usize;
    let mut best_off = 0usize;
    for len in THRESHOLD..=max_len {
        if len > window.len() {
            break;
        }
        let mut found = None;
        for off in 0..=(window.len() - len) {
            if window[off..off + len] == lookahead[..len] {
                found = Some(off);
                break;
            }
        }
        match found {
            Some(off) => {
                best_len = len;
                best_off = off;
            }
            None => break,
        }
    }
    (best_len, best_off)
}

fn append_to_window(window: &mut Vec<u8>, bytes: &[u8], window_size: usize) {
    window.extend_from_slice(bytes);
    if window.len() > window_size {
        let excess = window.len() - window_size;
        window.drain(..excess);
    }
}

/// Decompresses `data` produced by [`encode`] with the same `pre_bits`.
///
/// A match-code whose offset falls outside the current window is treated
/// as stream damage: the item is skipped rather than aborting the decode.
pub fn decode(data: &[u8], pre_bits: u32) -> Result<Vec<u8>> {
    anyhow::ensure!((4..=14).contains(&pre_bits), "pre_bits out of range: {pre_bits}");
    let window_bits = 16 - pre_bits;
    let window_size = ((1usize << window_bits) - 1) + THRESHOLD;
    let offset_mask = (1u16 << pre_bits) - 1;

    let mut out = Vec::new();
    let mut window: Vec<u8> = Vec::with_capacity(window_size);
    let mut i = 0usize;
    let n = data.len();

    while i < n {
        let flag = data[i];
        i += 1;
        for k in 0..8 {
            if i >= n {
                break;
            }
            if flag & (1 << (7 - k)) != 0 {
                let b = data[i];
                i += 1;
                out.push(b);
                window.push(b);
            } else {
                if i + 1 >= n {
                    break;
                }
                let lo = data[i] as u16;
                let hi = data[i + 1] as u16;
                i += 2;
                let code = (hi << 8) | lo;
                let offset = (code >> pre_bits) as usize;
                let length = (code & offset_mask) as usize + THRESHOLD;
                if offset >= window.len() {
                    continue;
                }
                // window grows uncapped for the whole run, so a match that
                // reaches past the pre-copy window tail can read bytes this
                // same run just produced (the trim below only runs once,
                // after the item, matching the reference decoder).
                for j in 0..length {
                    let b = window[offset + j];
                    out.push(b);
                    window.push(b);
                }
            }
            if window.len() > window_size {
                let excess = window.len() - window_size;
                window.drain(..excess);
            }
        }
    }
    Ok(out)
}
