// orgscan-core/src/infrastructure/codec.rs

// Storage-side encoding of cache records: JSON, then zstd, then hex so the
// result is a plain string any key/value store accepts.

use serde::{Serialize, de::DeserializeOwned};

use crate::infrastructure::error::InfrastructureError;

const COMPRESSION_LEVEL: i32 = 3;

pub fn encode<T: Serialize>(value: &T) -> Result<String, InfrastructureError> {
    let json = serde_json::to_vec(value)?;
    let compressed = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
        .map_err(|e| InfrastructureError::Compression(e.to_string()))?;
    Ok(hex::encode(compressed))
}

pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, InfrastructureError> {
    let compressed = hex::decode(text)?;
    let json = zstd::decode_all(compressed.as_slice())
        .map_err(|e| InfrastructureError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::{Value, json};

    #[test]
    fn test_encoded_text_is_lowercase_hex() -> Result<()> {
        let encoded = encode(&json!({ "type": "map", "length": 2 }))?;
        assert!(!encoded.is_empty());
        assert!(encoded.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        let decoded: Value = decode(&encoded)?;
        assert_eq!(decoded["length"], 2);
        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode::<Value>("not-hex"),
            Err(InfrastructureError::Hex(_))
        ));
        // Valid hex, but not a zstd frame.
        assert!(matches!(
            decode::<Value>("deadbeef"),
            Err(InfrastructureError::Compression(_))
        ));
    }
}
