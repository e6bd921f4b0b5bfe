use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::Utf8Error;
use std::sync::Arc;

use ahash::AHashSet;

/// Shared, immutable endpoint path. Hashes and compares as raw bytes so maps
/// keyed by it can be looked up with a borrowed `&[u8]` slice of a read buffer.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Endpoint(Arc<str>);

impl Endpoint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_bytes().hash(state);
    }
}

impl Borrow<[u8]> for Endpoint {
    fn borrow(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Endpoint(Arc::from(s))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-worker intern cache: one allocation per distinct endpoint.
#[derive(Debug, Default)]
pub struct Interner {
    cache: AHashSet<Endpoint>,
    hits: u64,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical endpoint for `bytes`, allocating only on a miss.
    /// The slice is not retained.
    pub fn intern(&mut self, bytes: &[u8]) -> Result<Endpoint, Utf8Error> {
        if let Some(endpoint) = self.cache.get(bytes) {
            self.hits += 1;
            return Ok(endpoint.clone());
        }
        let endpoint = Endpoint::from(std::str::from_utf8(bytes)?);
        self.cache.insert(endpoint.clone());
        Ok(endpoint)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}
