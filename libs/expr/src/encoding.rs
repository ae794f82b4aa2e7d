//! Binary-safe encodings for scalar data
//!
//! A tree can carry encoded text in an envelope:
//!
//! ```json
//! {"$encoding": "base64", "data": "aGVsbG8="}
//! ```
//!
//! Evaluation decodes the envelope to the UTF-8 text it holds.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{Error, Result};
use crate::tree::Tree;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// The empty encoding name: data is used as-is
    Identity,
    Base64,
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" => Ok(Encoding::Identity),
            "base64" => Ok(Encoding::Base64),
            other => Err(Error::UnknownEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Identity => "",
            Encoding::Base64 => "base64",
        })
    }
}

impl Encoding {
    pub fn decode(&self, data: &str) -> Result<String> {
        match self {
            Encoding::Identity => Ok(data.to_string()),
            Encoding::Base64 => {
                let bytes = STANDARD.decode(data).map_err(|err| self.failure(err))?;
                String::from_utf8(bytes).map_err(|err| self.failure(err))
            }
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Encoding::Identity => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Base64 => STANDARD.encode(bytes),
        }
    }

    fn failure(&self, err: impl fmt::Display) -> Error {
        Error::Decode {
            encoding: self.to_string(),
            message: err.to_string(),
        }
    }
}

/// Decode `data` with the named encoding.
pub fn decode(encoding: &str, data: &str) -> Result<String> {
    encoding.parse::<Encoding>()?.decode(data)
}

/// Wrap `bytes` in an encoding envelope.
pub fn envelope(encoding: Encoding, bytes: &[u8]) -> Tree {
    Tree::mapping([
        ("$encoding", Tree::String(encoding.to_string())),
        ("data", Tree::String(encoding.encode(bytes))),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_decode() {
        assert_eq!(decode("base64", "aGVsbG8=").unwrap(), "hello");
        assert_eq!(decode("", "plain").unwrap(), "plain");
    }

    #[test]
    fn test_decode_failures() {
        assert!(matches!(
            decode("base64", "!!!"),
            Err(Error::Decode { encoding, .. }) if encoding == "base64"
        ));
        // Valid base64 of invalid UTF-8
        assert!(matches!(decode("base64", "/w=="), Err(Error::Decode { .. })));
        assert!(matches!(decode("rot13", "x"), Err(Error::UnknownEncoding(name)) if name == "rot13"));
    }

    #[test]
    fn test_envelope() {
        let tree = envelope(Encoding::Base64, b"hello");
        assert_eq!(tree.get("data"), Some(&Tree::from("aGVsbG8=")));
    }
}
