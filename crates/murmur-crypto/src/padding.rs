//! ISO/IEC 7816-4 padding: a single `0x80` marker followed by zeros.
//!
//! Used so that every plaintext is the same length before encryption.

use crate::{CryptoError, Result};

/// Pad `data` to exactly `len` bytes. Needs at least one spare byte.
pub fn pad(data: &[u8], len: usize) -> Result<Vec<u8>> {
    if data.len() >= len {
        return Err(CryptoError::Padding(format!(
            "{} bytes do not fit padded length {len}",
            data.len()
        )));
    }
    let mut out = Vec::with_capacity(len);
    out.extend_from_slice(data);
    out.push(0x80);
    out.resize(len, 0);
    Ok(out)
}

/// Strip padding. Fails when no marker precedes the trailing zeros.
pub fn unpad(padded: &[u8]) -> Result<&[u8]> {
    match padded.iter().rposition(|&b| b != 0) {
        Some(i) if padded[i] == 0x80 => Ok(&padded[..i]),
        _ => Err(CryptoError::Padding("missing padding marker".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_unpad() {
        let padded = pad(b"abc", 16).expect("pad");
        assert_eq!(padded.len(), 16);
        assert_eq!(padded[3], 0x80);
        assert_eq!(unpad(&padded).expect("unpad"), b"abc");
    }

    #[test]
    fn test_payload_ending_in_marker_byte() {
        let data = [0x00, 0x80, 0x00];
        let padded = pad(&data, 8).expect("pad");
        assert_eq!(unpad(&padded).expect("unpad"), &data);
    }

    #[test]
    fn test_exact_fit_rejected() {
        assert!(pad(&[1u8; 8], 8).is_err());
        assert!(pad(&[1u8; 7], 8).is_ok());
    }

    #[test]
    fn test_missing_marker_rejected() {
        assert!(unpad(&[1, 2, 3, 0, 0]).is_err());
        assert!(unpad(&[0, 0, 0]).is_err());
    }
}
