//! The `.gr` graphics container: Lehmer-XOR-encrypted, LZSS-compressed raw
//! BMP bytes.
use crate::cipher::graphics_cipher;
use crate::lzss;
use anyhow::Result;

/// LZSS `pre_bits` used for every `.gr` payload.
pub const GR_PRE_BITS: u32 = 7;
/// The two-byte BMP signature sanity-checked on `bmp_to_gr`/`gr_to_bmp`.
pub const BMP_SIGNATURE: [u8; 2] = [0x42, 0x4D];

/// Unwraps a `.gr` file's raw bytes into a BMP byte blob.
pub fn gr_to_bmp(gr_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut buf = gr_bytes.to_vec();
    graphics_cipher(&mut buf);
    let bmp = lzss::decode(&buf, GR_PRE_BITS)?;
    anyhow::ensure!(
        bmp.len() >= 2 && bmp[0..2] == BMP_SIGNATURE,
        "InvalidContainer: decoded payload is not a BMP (missing 'BM' signature)"
    );
    Ok(bmp)
}

/// Wraps a BMP byte blob into `.gr` container bytes.
pub fn bmp_to_gr(bmp_bytes: &[u8]) -> Result<Vec<u8>> {
    anyhow::ensure!(
        bmp_bytes.len() >= 2 && bmp_bytes[0..2] == BMP_SIGNATURE,
        "InvalidContainer: input is not a BMP (missing 'BM' signature)"
    );
    let mut buf = lzss::encode(bmp_bytes, GR_PRE_BITS)?;
    graphics_cipher(&mut buf);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_bmp(body: &[u8]) -> Vec<u8> {
        let mut bmp = BMP_SIGNATURE.to_vec();
        bmp.extend_from_slice(body);
        bmp
    }

    #[test]
    fn round_trips_through_gr() {
        let bmp = fake_bmp(&(0..500u32).map(|i| (i % 251) as u8).collect::<Vec<u8>>());
        let gr = bmp_to_gr(&bmp).unwrap();
        let recovered = gr_to_bmp(&gr).unwrap();
        assert_eq!(recovered, bmp);
    }

    #[test]
    fn bmp_to_gr_rejects_bad_signature() {
        assert!(bmp_to_gr(b"not a bmp at all").is_err());
    }

    #[test]
    fn gr_to_bmp_rejects_decoded_payload_without_signature() {
        let junk = lzss::encode(b"definitely not a bitmap", GR_PRE_BITS).unwrap();
        let mut buf = junk;
        graphics_cipher(&mut buf);
        assert!(gr_to_bmp(&buf).is_err());
    }
}
