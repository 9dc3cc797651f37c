// SPDX-License-Identifier: MIT OR Apache-2.0

//! Value encodings.
//!
//! The store treats payloads as opaque bytes. A [`Codec`] turns a value into those bytes on
//! write and back into a caller-chosen type on read. Per-type encode/decode behaviour comes
//! from the type's own `Serialize`/`Deserialize` impls, so a domain customizing its own types
//! never affects another domain.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use thiserror::Error;

/// Failure reported by a [`Codec`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// JSON encoding or decoding failed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    /// YAML encoding or decoding failed.
    #[cfg(feature = "yaml")]
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The wire format used for stored values.
///
/// # Examples
///
/// ```
/// use verscfg::domain::Codec;
///
/// let mut bytes = Vec::new();
/// Codec::Json.encode(&vec![1, 2, 3], &mut bytes).unwrap();
/// assert_eq!(bytes, b"[1,2,3]");
///
/// let decoded: Vec<u8> = Codec::Json.decode(&bytes).unwrap();
/// assert_eq!(decoded, vec![1, 2, 3]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Codec {
    /// Compact JSON.
    #[default]
    Json,
    /// Indented JSON, easier to read straight out of the table.
    JsonPretty,
    /// YAML.
    #[cfg(feature = "yaml")]
    Yaml,
}

impl Codec {
    /// Returns a short name for logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Json => "json",
            Codec::JsonPretty => "json_pretty",
            #[cfg(feature = "yaml")]
            Codec::Yaml => "yaml",
        }
    }

    /// Encodes `value` into `writer`.
    ///
    /// Bytes are written incrementally, so `writer` may be a bounded pipe.
    pub fn encode<T, W>(&self, value: &T, writer: W) -> Result<(), CodecError>
    where
        T: Serialize + ?Sized,
        W: Write,
    {
        match self {
            Codec::Json => serde_json::to_writer(writer, value)?,
            Codec::JsonPretty => serde_json::to_writer_pretty(writer, value)?,
            #[cfg(feature = "yaml")]
            Codec::Yaml => serde_yaml::to_writer(writer, value)?,
        }
        Ok(())
    }

    /// Decodes a stored payload into `T`.
    pub fn decode<T>(&self, bytes: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        match self {
            Codec::Json | Codec::JsonPretty => Ok(serde_json::from_slice(bytes)?),
            #[cfg(feature = "yaml")]
            Codec::Yaml => Ok(serde_yaml::from_slice(bytes)?),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Limits {
        max_connections: u32,
        hosts: Vec<String>,
    }

    fn sample() -> Limits {
        Limits {
            max_connections: 32,
            hosts: vec!["a.internal".to_string(), "b.internal".to_string()],
        }
    }

    #[test]
    fn test_json_is_compact() {
        let mut bytes = Vec::new();
        Codec::Json.encode(&sample(), &mut bytes).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"max_connections":32,"hosts":["a.internal","b.internal"]}"#
        );
    }

    #[test]
    fn test_pretty_json_decodes_like_json() {
        let mut bytes = Vec::new();
        Codec::JsonPretty.encode(&sample(), &mut bytes).unwrap();
        assert!(bytes.contains(&b'\n'));
        let decoded: Limits = Codec::Json.decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_round_trip() {
        let mut bytes = Vec::new();
        Codec::Yaml.encode(&sample(), &mut bytes).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("max_connections: 32"));
        let decoded: Limits = Codec::Yaml.decode(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_decode_wrong_type_fails() {
        let result: Result<u32, _> = Codec::Json.decode(br#"{"max_connections":1}"#);
        assert!(matches!(result, Err(CodecError::Json(_))));
    }

    #[test]
    fn test_encode_non_string_map_keys_fails() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8, 2], "value");
        let mut bytes = Vec::new();
        assert!(Codec::Json.encode(&map, &mut bytes).is_err());
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(Codec::default(), Codec::Json);
        assert_eq!(Codec::Json.to_string(), "json");
        assert_eq!(Codec::JsonPretty.name(), "json_pretty");
    }

    #[test]
    fn test_codec_deserializes_from_snake_case() {
        let codec: Codec = serde_json::from_str("\"json_pretty\"").unwrap();
        assert_eq!(codec, Codec::JsonPretty);
    }
}
