// Path: crates/datalog/src/origin/mod.rs
//! Fact origins and trusted-origin resolution.
//!
//! Every fact is tagged with the set of block ids that contributed to its
//! derivation. A rule may only read facts whose entire origin set lies
//! inside the rule's trusted origins, which are computed from its scope
//! annotations. This is what keeps third-party facts invisible to rules
//! that never opted into them.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::Scope;

/// The reserved origin id of the authorizer itself.
pub const AUTHORIZER_ID: usize = usize::MAX;

/// The set of block ids that produced a fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Origin {
    inner: BTreeSet<usize>,
}

impl Origin {
    /// An empty origin set.
    pub fn new() -> Self {
        Origin::default()
    }

    /// The origin of facts added by the authorizer.
    pub fn authorizer() -> Self {
        let mut origin = Origin::new();
        origin.insert(AUTHORIZER_ID);
        origin
    }

    /// Adds a block id.
    pub fn insert(&mut self, block_id: usize) {
        self.inner.insert(block_id);
    }

    /// The union of two origin sets.
    pub fn union(&self, other: &Origin) -> Origin {
        Origin {
            inner: self.inner.union(&other.inner).copied().collect(),
        }
    }

    /// The block ids, in ascending order.
    pub fn block_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.inner.iter().copied()
    }

    /// True when every contributing block id is in `trusted`.
    pub fn is_subset_of(&self, trusted: &TrustedOrigins) -> bool {
        self.inner.iter().all(|id| trusted.contains_id(*id))
    }
}

impl From<usize> for Origin {
    fn from(block_id: usize) -> Self {
        let mut origin = Origin::new();
        origin.insert(block_id);
        origin
    }
}

/// The set of origin ids a rule is allowed to read facts from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrustedOrigins {
    inner: BTreeSet<usize>,
}

impl Default for TrustedOrigins {
    /// Defaults to the authority block and the authorizer.
    fn default() -> Self {
        let mut inner = BTreeSet::new();
        inner.insert(0);
        inner.insert(AUTHORIZER_ID);
        TrustedOrigins { inner }
    }
}

impl TrustedOrigins {
    /// Resolves a scope list into a trusted-origin set.
    ///
    /// The rule's own block and the authorizer are always trusted. An empty
    /// scope list falls back to the defaults (authority + authorizer).
    pub fn from_scopes(
        scopes: &[Scope],
        current_block: usize,
        public_key_to_block_id: &HashMap<u64, Vec<usize>>,
    ) -> Self {
        let mut inner = BTreeSet::new();
        inner.insert(current_block);
        inner.insert(AUTHORIZER_ID);

        if scopes.is_empty() {
            inner.insert(0);
            return TrustedOrigins { inner };
        }

        for scope in scopes {
            match scope {
                Scope::Authority => {
                    inner.insert(0);
                }
                Scope::Previous => {
                    if current_block != AUTHORIZER_ID {
                        inner.extend(0..=current_block);
                    }
                }
                Scope::PublicKey(key_id) => {
                    if let Some(block_ids) = public_key_to_block_id.get(key_id) {
                        inner.extend(block_ids.iter().copied());
                    }
                }
            }
        }

        TrustedOrigins { inner }
    }

    /// True when the id itself is trusted.
    pub fn contains_id(&self, id: usize) -> bool {
        self.inner.contains(&id)
    }

    /// True when a fact with this origin may be read.
    pub fn contains(&self, origin: &Origin) -> bool {
        origin.is_subset_of(self)
    }
}
