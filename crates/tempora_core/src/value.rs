//! JSON value model shared by payloads and entity state.
//!
//! `serde_json::Map` is BTreeMap-backed here, so field iteration is always
//! in key order and encodings of equal states are byte-identical.

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event payload: open string-keyed mapping
pub type Payload = Map<String, Value>;

/// Entity state: open string-keyed mapping
pub type State = Map<String, Value>;

/// Content digest of a state mapping (blake3 over its JSON encoding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateDigest([u8; 32]);

impl StateDigest {
    /// Compute the digest of a state
    ///
    /// # Errors
    ///
    /// Returns the encoder's failure as a `CoreError`
    pub fn of(state: &State) -> CoreResult<Self> {
        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, state)?;
        Ok(Self(*hasher.finalize().as_bytes()))
    }

    /// Get raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex encoding of the digest
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for StateDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_digest_deterministic() {
        let s = state(json!({"status": "active", "employee_count": 10}));
        assert_eq!(StateDigest::of(&s).unwrap(), StateDigest::of(&s.clone()).unwrap());
    }

    #[test]
    fn test_digest_independent_of_insertion_order() {
        let mut a = State::new();
        a.insert("b".to_string(), json!(2));
        a.insert("a".to_string(), json!(1));

        let mut b = State::new();
        b.insert("a".to_string(), json!(1));
        b.insert("b".to_string(), json!(2));

        assert_eq!(StateDigest::of(&a).unwrap(), StateDigest::of(&b).unwrap());
    }

    #[test]
    fn test_digest_changes_with_state() {
        let a = state(json!({"status": "active"}));
        let b = state(json!({"status": "stable"}));
        let da = StateDigest::of(&a).unwrap();
        assert_ne!(da, StateDigest::of(&b).unwrap());
        assert_eq!(da.to_hex().len(), 64);
        assert_ne!(da.as_bytes(), &[0u8; 32]);
    }
}
