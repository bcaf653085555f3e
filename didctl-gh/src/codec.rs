//! # Content Codec
//!
//! Blob content is either JSON, plain text, or opaque binary carried as
//! base64. Text read from a blob is parsed as JSON when possible, and falls
//! back to the raw string otherwise. Local files are carried verbatim as text
//! so their bytes reach the blob unchanged; JSON is only parsed to compare
//! records structurally.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;

/// Content of a blob as the facade hands it out and accepts it
#[derive(Debug, Clone, PartialEq)]
pub enum BlobContent {
  Json(Value),
  Text(String),
  /// Base64 of the raw bytes
  Binary(String),
}

/// Parse `raw` as JSON. Returns the parsed value and `true`, or the raw
/// string as a JSON string value and `false`.
pub fn try_parse_json(raw: &str) -> (Value, bool) {
  match serde_json::from_str::<Value>(raw) {
    Ok(value) => (value, true),
    Err(_) => (Value::String(raw.to_string()), false),
  }
}

/// Extension check used by binary detection
pub fn is_json_path(path: &str) -> bool {
  path
    .rsplit_once('.')
    .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("json"))
}

/// GraphQL reports `isBinary: null` when it cannot tell. JSON files are
/// always text; any other unknown file is treated as binary.
pub fn resolve_is_binary(reported: Option<bool>, path: &str) -> bool {
  reported.unwrap_or_else(|| !is_json_path(path))
}

/// Strip the line breaks GitHub inserts into base64 payloads
pub fn normalize_base64(encoded: &str) -> String {
  encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}

impl BlobContent {
  /// Classify text read from a blob
  pub fn from_text(raw: &str) -> Self {
    match try_parse_json(raw) {
      (value, true) => BlobContent::Json(value),
      (_, false) => BlobContent::Text(raw.to_string()),
    }
  }

  pub fn from_bytes(bytes: &[u8]) -> Self {
    BlobContent::Binary(STANDARD.encode(bytes))
  }

  /// Content of a local file, stored byte for byte: UTF-8 is kept as text,
  /// anything else is binary.
  pub fn from_file_bytes(bytes: &[u8]) -> Self {
    match std::str::from_utf8(bytes) {
      Ok(text) => BlobContent::Text(text.to_string()),
      Err(_) => Self::from_bytes(bytes),
    }
  }

  pub const fn is_binary(&self) -> bool {
    matches!(self, BlobContent::Binary(_))
  }

  /// Base64 payload for the contents API. Binary content is already encoded.
  pub fn to_base64(&self) -> String {
    match self {
      BlobContent::Json(value) => STANDARD.encode(value.to_string()),
      BlobContent::Text(text) => STANDARD.encode(text),
      BlobContent::Binary(encoded) => normalize_base64(encoded),
    }
  }

  /// The bytes that end up in the blob
  pub fn to_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
    match self {
      BlobContent::Json(value) => Ok(value.to_string().into_bytes()),
      BlobContent::Text(text) => Ok(text.clone().into_bytes()),
      BlobContent::Binary(encoded) => STANDARD.decode(normalize_base64(encoded)),
    }
  }

  /// The content as JSON, parsing text that holds a JSON document
  fn json_view(&self) -> Option<Cow<'_, Value>> {
    match self {
      BlobContent::Json(value) => Some(Cow::Borrowed(value)),
      BlobContent::Text(text) => match try_parse_json(text) {
        (value, true) => Some(Cow::Owned(value)),
        (_, false) => None,
      },
      BlobContent::Binary(_) => None,
    }
  }

  /// Structural equality when both sides are JSON, byte equality otherwise.
  /// Numbers compare by their exact literal, so distinct big integers never
  /// collapse into one.
  pub fn same_as(&self, other: &BlobContent) -> bool {
    if let (Some(a), Some(b)) = (self.json_view(), other.json_view()) {
      return a == b;
    }
    match (self.to_bytes(), other.to_bytes()) {
      (Ok(a), Ok(b)) => a == b,
      _ => false,
    }
  }

  /// JSON value when the content is JSON
  pub const fn as_json(&self) -> Option<&Value> {
    match self {
      BlobContent::Json(value) => Some(value),
      _ => None,
    }
  }
}

impl From<Value> for BlobContent {
  fn from(value: Value) -> Self {
    BlobContent::Json(value)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn test_try_parse_json() {
    assert_eq!(try_parse_json(r#"{"x":1}"#), (json!({"x": 1}), true));
    assert_eq!(try_parse_json("plain words"), (json!("plain words"), false));
  }

  #[test]
  fn test_binary_detection() {
    assert!(!resolve_is_binary(None, "a.json"));
    assert!(!resolve_is_binary(None, "dir/A.JSON"));
    assert!(resolve_is_binary(None, "logo.png"));
    assert!(resolve_is_binary(None, "0xabc.cre"));
    assert!(resolve_is_binary(None, "README"));
    assert!(!resolve_is_binary(Some(false), "logo.png"));
    assert!(resolve_is_binary(Some(true), "a.json"));
  }

  #[test]
  fn test_from_text() {
    assert_eq!(BlobContent::from_text(r#"{"a": [1, 2]}"#), BlobContent::Json(json!({"a": [1, 2]})));
    assert_eq!(BlobContent::from_text("hello"), BlobContent::Text("hello".to_string()));
  }

  #[test]
  fn test_from_file_bytes() {
    assert!(BlobContent::from_file_bytes(&[0xff, 0xfe, 0x00]).is_binary());
    assert_eq!(BlobContent::from_file_bytes(b"hi"), BlobContent::Text("hi".to_string()));

    let pretty = b"{\n  \"z\": 1,\n  \"a\": 123456789012345678901234567890\n}\n";
    let content = BlobContent::from_file_bytes(pretty);
    assert_eq!(content.to_bytes().unwrap(), pretty.to_vec());
  }

  #[test]
  fn test_json_keeps_big_numbers_and_key_order() {
    let content = BlobContent::from_text(r#"{"z":1,"a":123456789012345678901234567890}"#);
    assert_eq!(
      content.to_bytes().unwrap(),
      br#"{"z":1,"a":123456789012345678901234567890}"#.to_vec()
    );
  }

  #[test]
  fn test_to_base64() {
    assert_eq!(BlobContent::Json(json!({"x": 1})).to_base64(), "eyJ4IjoxfQ==");
    assert_eq!(BlobContent::Text("hi".into()).to_base64(), "aGk=");
    assert_eq!(BlobContent::Binary("aG\nk=".into()).to_base64(), "aGk=");
  }

  #[test]
  fn test_same_as_is_structural_for_json() {
    let a = BlobContent::Json(json!({"a": 1, "b": [true, null]}));
    let b = BlobContent::from_text(r#"{ "b": [true, null], "a": 1 }"#);
    assert!(a.same_as(&b));
    assert!(!a.same_as(&BlobContent::Json(json!({"a": 2, "b": [true, null]}))));

    // Local text against a stored record
    let local = BlobContent::from_file_bytes(b"{\n  \"b\": [true, null],\n  \"a\": 1\n}\n");
    assert!(local.same_as(&a));
  }

  #[test]
  fn test_same_as_distinguishes_big_integers() {
    let stored = BlobContent::from_text(r#"{"n":123456789012345678901234567890}"#);
    let local = BlobContent::from_file_bytes(b"{\"n\": 123456789012345678901234567891}");
    assert!(!stored.same_as(&local));
  }

  #[test]
  fn test_same_as_for_text_and_binary() {
    assert!(BlobContent::Text("hi".into()).same_as(&BlobContent::Binary("aGk=".into())));
    assert!(!BlobContent::Text("hi".into()).same_as(&BlobContent::Text("ho".into())));
    assert!(!BlobContent::Binary("!!".into()).same_as(&BlobContent::Binary("!!".into())));
  }
}
