//! Shared type definitions for the minipack crate

use std::{fmt, hash::BuildHasherDefault};

use indexmap::IndexMap;
use rustc_hash::FxHasher;
use serde::Serialize;

/// Insertion-ordered map with the fast, non-cryptographic Fx hasher
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Build-scoped identifier of an extracted asset
///
/// Ids are handed out in discovery order by a
/// [`BuildSession`](crate::session::BuildSession). After a session reset the
/// entry module always receives [`ModuleId::ENTRY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    /// Id the bootstrap loader evaluates first
    pub const ENTRY: Self = Self(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value of the ModuleId
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    pub const fn is_entry(&self) -> bool {
        self.0 == Self::ENTRY.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
