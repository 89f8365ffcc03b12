use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Canonical key of a reaction's net transformation.
///
/// Produced by composing reactants and products into one condensed structure
/// and serializing it canonically. Two records share a signature exactly when
/// they describe the same transformation, regardless of molecule order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSignature(String);

impl CanonicalSignature {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CanonicalSignature {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for CanonicalSignature {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for CanonicalSignature {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}
