//! Hash dictionaries for resolving symbolic names.
//!
//! Model files only store 64-bit hashes of names. A [`HashDictionary`] maps
//! those hashes back to text and learns new pairs as names are minted, so that
//! they can be exported alongside a written model.

use std::fs;
use std::path::Path;

use pd2model_common::hash;
use rustc_hash::FxHashMap;

use crate::Result;

/// A string/hash dictionary.
///
/// Dictionaries are passed explicitly to every call that needs one; there is
/// no process-wide name table.
pub trait HashDictionary {
    /// Hash a string with the dictionary's hashing rule.
    fn hash(&self, s: &str) -> u64;

    /// Look up the best-known string for a hash.
    fn lookup(&self, hash: u64) -> Option<&str>;

    /// Register a `(hash, string)` pair for later lookups.
    fn hint(&mut self, hash: u64, s: &str);
}

/// An in-memory dictionary using the engine's string hash.
#[derive(Debug, Clone, Default)]
pub struct Hashlist {
    names: FxHashMap<u64, String>,
}

impl Hashlist {
    /// Create an empty hashlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a hashlist from newline-separated names.
    ///
    /// Blank lines are skipped and Windows line endings are accepted.
    pub fn parse(text: &str) -> Self {
        let mut list = Self::new();
        for line in text.lines() {
            let name = line.trim_end_matches('\r');
            if !name.is_empty() {
                list.add(name);
            }
        }
        list
    }

    /// Load a hashlist from a text file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Hash a name and add it, returning the hash.
    pub fn add(&mut self, name: &str) -> u64 {
        let hash = hash::hash_str(name);
        self.hint(hash, name);
        hash
    }

    /// Number of known names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no names are known.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over all known `(hash, name)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.names.iter().map(|(&k, v)| (k, v.as_str()))
    }
}

impl HashDictionary for Hashlist {
    fn hash(&self, s: &str) -> u64 {
        hash::hash_str(s)
    }

    fn lookup(&self, hash: u64) -> Option<&str> {
        self.names.get(&hash).map(String::as_str)
    }

    fn hint(&mut self, hash: u64, s: &str) {
        // First writer wins; a later colliding string never replaces it.
        self.names.entry(hash).or_insert_with(|| s.to_string());
    }
}
