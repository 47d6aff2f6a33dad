use super::account::AccountId;
use super::codec::Record;
use super::ledger::{self, LedgerError, LedgerResult};
use super::store::StateStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Storage key of the account index. Never a valid account id.
pub const RESERVED_INDEX_KEY: &str = "LIST";

/// Every account id ever created, in creation order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccountIndex {
    #[serde(rename = "list")]
    tag: String,

    #[serde(rename = "userid", default)]
    ids: Vec<AccountId>,
}

impl Record for AccountIndex {}

impl AccountIndex {
    pub fn new() -> Self {
        Self {
            tag: RESERVED_INDEX_KEY.to_owned(),
            ids: Vec::new(),
        }
    }

    pub fn ids(&self) -> &[AccountId] {
        &self.ids
    }

    pub fn contains(&self, id: &AccountId) -> bool {
        self.ids.contains(id)
    }

    /// Appends `id` unless it is already listed. Returns whether it was added.
    pub fn push(&mut self, id: AccountId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Repairs an index written by an older deployment: drops repeated ids,
    /// keeping the first occurrence, and restores the tag. Returns whether
    /// anything changed.
    fn normalize(&mut self, key: &str) -> bool {
        let mut changed = false;
        if self.tag != key {
            warn!("account index under {key} is tagged {:?}, retagging", self.tag);
            self.tag = key.to_owned();
            changed = true;
        }

        let listed = self.ids.len();
        let mut seen = HashSet::new();
        self.ids.retain(|id| seen.insert(id.clone()));
        if self.ids.len() != listed {
            warn!(
                "account index under {key} listed {} ids more than once, dropping repeats",
                listed - self.ids.len()
            );
            changed = true;
        }
        changed
    }
}

impl Default for AccountIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// An index as found in the store.
enum Stored {
    /// Decoded as written, with the bytes it was read from.
    Intact(AccountIndex, Vec<u8>),
    /// Written by an older deployment and normalized since.
    Repaired(AccountIndex),
}

/// Read-modify-write access to the singleton [`AccountIndex`].
///
/// The index is created by the first append; until then its absence is the
/// expected state. The sequence is only as atomic as the store's own writes,
/// so concurrent creations may race on it.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    key: &'static str,
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self {
            key: RESERVED_INDEX_KEY,
        }
    }
}

impl AccountRegistry {
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Loads and normalizes the stored index. Comes back as
    /// [`Stored::Repaired`] when the stored bytes needed fixing.
    fn load<S: StateStore + ?Sized>(&self, store: &S) -> LedgerResult<Option<Stored>> {
        Ok(ledger::load_record::<AccountIndex, S>(store, self.key)?.map(|(mut index, bytes)| {
            if index.normalize(self.key) {
                Stored::Repaired(index)
            } else {
                Stored::Intact(index, bytes)
            }
        }))
    }

    /// Computes the index write that records `id`, without performing it.
    ///
    /// Returns `None` when `id` is already listed and the stored index needs
    /// no repair, so nothing needs writing.
    pub fn stage_append<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &AccountId,
    ) -> LedgerResult<Option<(String, Vec<u8>)>> {
        let (mut index, repaired) = match self.load(store)? {
            Some(Stored::Intact(index, _)) => (index, false),
            Some(Stored::Repaired(index)) => (index, true),
            None => {
                debug!("no account index under {}, starting a fresh one", self.key);
                (AccountIndex::new(), false)
            }
        };
        if !index.push(id.clone()) && !repaired {
            debug!("{id} is already in the account index");
            return Ok(None);
        }

        let bytes = ledger::encode_record(&index, self.key)?;
        Ok(Some((self.key.to_owned(), bytes)))
    }

    pub fn append<S: StateStore + ?Sized>(&self, store: &mut S, id: &AccountId) -> LedgerResult<()> {
        if let Some((key, bytes)) = self.stage_append(&*store, id)? {
            store.put(&key, bytes)?;
        }
        Ok(())
    }

    pub fn list<S: StateStore + ?Sized>(&self, store: &S) -> LedgerResult<Vec<AccountId>> {
        match self.require(store)? {
            Stored::Intact(index, _) | Stored::Repaired(index) => Ok(index.ids),
        }
    }

    /// The stored index bytes once they are known to decode. An index that
    /// needed repair is returned re-encoded; the store is left for the next
    /// append to rewrite.
    pub fn raw<S: StateStore + ?Sized>(&self, store: &S) -> LedgerResult<Vec<u8>> {
        match self.require(store)? {
            Stored::Intact(_, bytes) => Ok(bytes),
            Stored::Repaired(index) => ledger::encode_record(&index, self.key),
        }
    }

    fn require<S: StateStore + ?Sized>(&self, store: &S) -> LedgerResult<Stored> {
        self.load(store)?.ok_or_else(|| LedgerError::NotFound {
            key: self.key.to_owned(),
        })
    }
}
