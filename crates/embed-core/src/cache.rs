//! Embed cache for one generation pass
//!
//! Keys pair the schema type with a SHA-256 digest of the raw value, so an
//! image field and a read-only image field holding the same bytes never
//! share a handle.

use crate::document::EmbedHandle;
use crate::schema::SchemaType;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbedKey {
    pub schema_type: SchemaType,
    pub digest: [u8; 32],
}

impl EmbedKey {
    pub fn new(schema_type: SchemaType, value: &str) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(value.as_bytes()));
        Self {
            schema_type,
            digest,
        }
    }
}

#[derive(Debug, Default)]
pub struct EmbedCache {
    entries: HashMap<EmbedKey, Rc<EmbedHandle>>,
}

impl EmbedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &EmbedKey) -> Option<Rc<EmbedHandle>> {
        self.entries.get(key).cloned()
    }

    /// Store a handle. An existing entry wins; the new handle is dropped.
    pub fn set(&mut self, key: EmbedKey, handle: Rc<EmbedHandle>) -> Rc<EmbedHandle> {
        self.entries.entry(key).or_insert(handle).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
