//! CBOR serialization helpers for chunk and invitation payloads.

use serde::{de::DeserializeOwned, Serialize};

use crate::{CryptoError, Result};

/// Serialize a value to CBOR bytes.
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| CryptoError::Serialization(format!("CBOR serialization failed: {e}")))?;
    Ok(buf)
}

/// Deserialize a value from CBOR bytes.
pub fn from_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data)
        .map_err(|e| CryptoError::Serialization(format!("CBOR deserialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_types::chunk::MessageBody;

    #[test]
    fn test_message_body_roundtrip() {
        let body = MessageBody {
            other_recipients: vec!["carol".into()],
            text: "hi".into(),
        };
        let bytes = to_vec(&body).expect("serialize");
        let restored: MessageBody = from_slice(&bytes).expect("deserialize");
        assert_eq!(body, restored);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(from_slice::<MessageBody>(&[0xFF, 0x00, 0x13]).is_err());
    }
}
