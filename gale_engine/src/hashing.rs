//! Content-addressed ids.
//!
//! Rooms are authored with human-readable string ids but addressed at runtime
//! (and in save files) by a 32-bit hash of that string. [`HashRegistry`] records
//! every hash handed out so that two ids colliding is caught when the world is
//! indexed rather than silently merging two rooms. Debug builds also keep the
//! reverse map so the error can name both colliding strings.

use std::collections::HashMap;

use thiserror::Error;

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of a string id.
pub fn hash_str(key: &str) -> u32 {
    key.bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("id '{key}' hashes to {hash:#010x}, already used by {existing}")]
    Collision { key: String, hash: u32, existing: String },
    #[error("id '{0}' hashes to the reserved value 0")]
    Reserved(String),
}

/// Maps hashed ids to the region that owns them.
#[derive(Debug, Default, Clone)]
pub struct HashRegistry {
    owners: HashMap<u32, u32>,
    #[cfg(debug_assertions)]
    names: HashMap<u32, String>,
}

impl HashRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash `key`, record `owner` for it, and return the hash.
    ///
    /// # Errors
    /// - if the hash is already registered (duplicate id or genuine collision)
    /// - if the hash is 0, which is reserved for "no room"
    pub fn register(&mut self, key: &str, owner: u32) -> Result<u32, HashError> {
        let hash = hash_str(key);
        if hash == 0 {
            return Err(HashError::Reserved(key.to_string()));
        }
        if let Some(existing_owner) = self.owners.get(&hash) {
            return Err(HashError::Collision {
                key: key.to_string(),
                hash,
                existing: self.describe(hash, *existing_owner),
            });
        }
        self.owners.insert(hash, owner);
        #[cfg(debug_assertions)]
        self.names.insert(hash, key.to_string());
        Ok(hash)
    }

    pub fn owner(&self, hash: u32) -> Option<u32> {
        self.owners.get(&hash).copied()
    }

    /// The original string for a hash, when the reverse map is compiled in.
    pub fn name(&self, hash: u32) -> Option<&str> {
        #[cfg(debug_assertions)]
        {
            self.names.get(&hash).map(String::as_str)
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = hash;
            None
        }
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn describe(&self, hash: u32, owner: u32) -> String {
        match self.name(hash) {
            Some(name) => format!("'{name}' in region {owner}"),
            None => format!("an id in region {owner}"),
        }
    }
}
