use encoding_rs::{Encoding, UTF_8};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Text encoding of an rc file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// Look an encoding up by any WHATWG label, e.g. `"latin1"`.
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Charset)
            .ok_or_else(|| Error::UnknownEncoding(label.to_string()))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Decode file contents, dropping a byte order mark. Malformed input
    /// is an error rather than replaced.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let (text, malformed) = self.0.decode_with_bom_removal(bytes);
        if malformed {
            return Err(Error::Decode(self.name()));
        }
        Ok(text.into_owned())
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let (bytes, used, unmappable) = self.0.encode(text);
        if unmappable || used != self.0 {
            return Err(Error::Encode(self.name()));
        }
        Ok(bytes.into_owned())
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset(UTF_8)
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self> {
        Self::for_label(label)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Charset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Charset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::for_label(&label).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_utf8() {
        assert_eq!(Charset::default().name(), "UTF-8");
        assert_eq!(Charset::default().to_string(), "UTF-8");
    }

    #[test]
    fn test_labels() {
        let latin1: Charset = "latin1".parse().unwrap();
        assert_eq!(latin1.name(), "windows-1252");
        assert!(matches!(
            Charset::for_label("klingon"),
            Err(Error::UnknownEncoding(label)) if label == "klingon"
        ));
    }

    #[test]
    fn test_decode_and_encode_latin1() {
        let latin1 = Charset::for_label("iso-8859-1").unwrap();
        assert_eq!(latin1.decode(b"caf\xe9").unwrap(), "café");
        assert_eq!(latin1.encode("café").unwrap(), b"caf\xe9");
        assert!(matches!(latin1.encode("日本"), Err(Error::Encode(_))));
    }

    #[test]
    fn test_malformed_utf8_is_rejected() {
        let malformed = Charset::default().decode(b"A=\xff\n");
        assert!(matches!(malformed, Err(Error::Decode("UTF-8"))));
        assert_eq!(Charset::default().decode(b"\xef\xbb\xbfA=1").unwrap(), "A=1");
    }

    #[test]
    fn test_utf16_cannot_encode() {
        let utf16 = Charset::for_label("utf-16le").unwrap();
        assert!(matches!(utf16.encode("A=1"), Err(Error::Encode(_))));
    }
}
