//! Opaque entity identifiers.
//!
//! Backends disagree on whether ids are JSON strings or integers, so both
//! forms deserialize into the same [`EntityId`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
  pub fn new(raw: impl Into<String>) -> Self { Self(raw.into().trim().to_owned()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_blank(&self) -> bool { self.0.is_empty() }

  /// Parse a loosely-typed JSON value (`"12"`, `12`) into an id.
  pub fn from_json(value: &serde_json::Value) -> Option<Self> {
    match value {
      serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self::new(s.as_str())),
      serde_json::Value::Number(n) => Some(Self(n.to_string())),
      _ => None,
    }
  }
}

impl fmt::Display for EntityId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for EntityId {
  fn from(s: &str) -> Self { Self::new(s) }
}

impl From<String> for EntityId {
  fn from(s: String) -> Self { Self::new(s) }
}

impl From<u64> for EntityId {
  fn from(n: u64) -> Self { Self(n.to_string()) }
}

impl Serialize for EntityId {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&self.0)
  }
}

impl<'de> Deserialize<'de> for EntityId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Str(String),
      Int(i64),
      Uint(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
      Raw::Str(s) => Self::new(s),
      Raw::Int(n) => Self(n.to_string()),
      Raw::Uint(n) => Self(n.to_string()),
    })
  }
}
