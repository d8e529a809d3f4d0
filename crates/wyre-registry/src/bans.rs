//! The ban multiset.
//!
//! When a scope declares an explicit binding for a key, every ancestor
//! must be kept from synthesizing a conflicting binding for that key later
//! (a descendant's explicit binding outranks ancestor synthesis). Each
//! such registration records one ban entry — per (contributing scope,
//! source) pair — at every proper ancestor. Bans are never un-banned while
//! the contributor lives; when the contributing scope is dropped, exactly
//! its entries are retracted, leaving any other contributor's overlapping
//! entries for the same key in force.
//!
//! The whole table lives at the tree root behind the tree mutex; a
//! reverse index per contributor makes retraction exact without scanning.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use wyre_common::{Key, Source};

use crate::scope::ScopeId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct BanEntry {
    contributor: ScopeId,
    source: Source,
}

/// Root-owned ban bookkeeping for one scope tree.
#[derive(Default, Debug)]
pub(crate) struct BanTable {
    /// Per affected node: key -> entries banning it there.
    bans: FxHashMap<ScopeId, FxHashMap<Key, SmallVec<[BanEntry; 1]>>>,
    /// Per contributor: every (affected node, key, source) it recorded.
    contributions: FxHashMap<ScopeId, Vec<(ScopeId, Key, Source)>>,
}

impl BanTable {
    /// Record that `contributor` bans `key` at `node`.
    pub(crate) fn add(&mut self, node: ScopeId, key: &Key, contributor: ScopeId, source: Source) {
        self.bans
            .entry(node)
            .or_default()
            .entry(key.clone())
            .or_default()
            .push(BanEntry {
                contributor,
                source,
            });
        self.contributions
            .entry(contributor)
            .or_default()
            .push((node, key.clone(), source));
    }

    /// Is `key` banned at `node` by any live contributor?
    pub(crate) fn is_banned(&self, node: ScopeId, key: &Key) -> bool {
        self.bans
            .get(&node)
            .and_then(|keys| keys.get(key))
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Retract every entry contributed by `contributor`. Returns how many
    /// entries were removed.
    ///
    /// Multiset semantics: for each recorded (node, key, source) exactly
    /// one matching entry is removed, never another contributor's entry
    /// for the same key.
    pub(crate) fn retract_contributor(&mut self, contributor: ScopeId) -> usize {
        let Some(recorded) = self.contributions.remove(&contributor) else {
            return 0;
        };
        let mut removed = 0;
        for (node, key, source) in recorded {
            let Some(keys) = self.bans.get_mut(&node) else {
                continue;
            };
            if let Some(entries) = keys.get_mut(&key) {
                let wanted = BanEntry {
                    contributor,
                    source,
                };
                if let Some(pos) = entries.iter().position(|entry| *entry == wanted) {
                    entries.remove(pos);
                    removed += 1;
                }
                if entries.is_empty() {
                    keys.remove(&key);
                }
            }
            if keys.is_empty() {
                self.bans.remove(&node);
            }
        }
        removed
    }

    #[cfg(test)]
    fn entry_count(&self, node: ScopeId, key: &Key) -> usize {
        self.bans
            .get(&node)
            .and_then(|keys| keys.get(key))
            .map_or(0, SmallVec::len)
    }
}
