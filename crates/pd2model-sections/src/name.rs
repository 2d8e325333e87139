//! Symbolic names.
//!
//! Names in model sections are 64-bit hashes. A [`HashName`] carries the hash
//! and, when it was built from text, the original string.

use std::hash::{Hash, Hasher};

use crate::hashlist::HashDictionary;

/// A hashed symbolic name.
///
/// Equality and hashing consider only the 64-bit hash, never the string.
#[derive(Debug, Clone)]
pub struct HashName {
    hash: u64,
    string: Option<String>,
}

impl HashName {
    /// Create a name from a raw hash value.
    pub const fn from_hash(hash: u64) -> Self {
        Self { hash, string: None }
    }

    /// Create a name from a string, registering it with the dictionary.
    pub fn from_string<D: HashDictionary + ?Sized>(s: &str, dict: &mut D) -> Self {
        let hash = dict.hash(s);
        dict.hint(hash, s);
        Self {
            hash,
            string: Some(s.to_string()),
        }
    }

    /// Get the raw hash value.
    pub const fn hash(&self) -> u64 {
        self.hash
    }

    /// Get the string this name was built from, if any.
    pub fn string(&self) -> Option<&str> {
        self.string.as_deref()
    }

    /// Resolve the name for display.
    ///
    /// Falls back to the name's own string, then to `#` followed by the hash
    /// as sixteen hex digits.
    pub fn display_string<D: HashDictionary + ?Sized>(&self, dict: &D) -> String {
        dict.lookup(self.hash)
            .or(self.string.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{:016x}", self.hash))
    }

    /// Register this name's string with a dictionary, if it has one.
    pub fn collect<D: HashDictionary + ?Sized>(&self, dict: &mut D) {
        if let Some(s) = &self.string {
            dict.hint(self.hash, s);
        }
    }
}

impl PartialEq for HashName {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for HashName {}

impl Hash for HashName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl From<u64> for HashName {
    fn from(hash: u64) -> Self {
        Self::from_hash(hash)
    }
}

impl std::fmt::Display for HashName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.string {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "#{:016x}", self.hash),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for HashName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.hash)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for HashName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Self::from_hash)
    }
}
