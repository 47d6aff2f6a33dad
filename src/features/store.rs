use std::collections::BTreeMap;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("State store failed on key {key}: {reason}")]
    Backend { key: String, reason: String },

    #[error("State snapshot is unreadable")]
    Snapshot(#[from] serde_json::Error),

    #[error("Value under key {0} is not valid UTF-8 and cannot be snapshotted")]
    NotText(String),

    #[error("State snapshot I/O failed")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Byte oriented key/value state the ledger is persisted in.
///
/// The host owns durability and ordering between invocations; the ledger only
/// reads and writes through this interface and never caches across calls.
pub trait StateStore {
    /// Returns `Ok(None)` when nothing was ever written under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    fn put(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Commits several writes together.
    ///
    /// The default applies them one by one, so a failure part way through
    /// leaves the earlier writes in place. Stores with a transactional
    /// primitive should override this.
    fn put_batch(&mut self, writes: Vec<(String, Vec<u8>)>) -> StoreResult<()> {
        for (key, value) in writes {
            self.put(&key, value)?;
        }
        Ok(())
    }
}

/// In-process store keeping every record in memory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemoryStore {
    records: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Loads a store previously written by [`MemoryStore::write_snapshot`].
    pub fn read_snapshot(reader: impl Read) -> StoreResult<Self> {
        let snapshot: BTreeMap<String, String> = serde_json::from_reader(reader)?;
        let records = snapshot
            .into_iter()
            .map(|(key, value)| (key, value.into_bytes()))
            .collect();
        Ok(Self { records })
    }

    /// Renders every record as a JSON object of key to text value.
    pub fn to_snapshot(&self) -> StoreResult<Vec<u8>> {
        let snapshot = self
            .records
            .iter()
            .map(|(key, value)| {
                let text = std::str::from_utf8(value)
                    .map_err(|_| StoreError::NotText(key.clone()))?;
                Ok((key.as_str(), text))
            })
            .collect::<StoreResult<BTreeMap<_, _>>>()?;
        Ok(serde_json::to_vec_pretty(&snapshot)?)
    }

    /// Writes [`MemoryStore::to_snapshot`]. Nothing reaches `writer` unless
    /// the whole snapshot could be rendered.
    pub fn write_snapshot(&self, mut writer: impl Write) -> StoreResult<()> {
        let snapshot = self.to_snapshot()?;
        writer.write_all(&snapshot)?;
        writer.flush()?;
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.records.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        debug!("put {key} ({} bytes)", value.len());
        self.records.insert(key.to_owned(), value);
        Ok(())
    }

    fn put_batch(&mut self, writes: Vec<(String, Vec<u8>)>) -> StoreResult<()> {
        debug!("put batch of {} writes", writes.len());
        self.records.extend(writes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_reads_as_none() {
        assert_eq!(MemoryStore::new().get("missing").unwrap(), None);
    }

    #[test]
    fn batch_applies_every_write() {
        let mut store = MemoryStore::new();
        store
            .put_batch(vec![("a".into(), b"1".to_vec()), ("b".into(), b"2".to_vec())])
            .unwrap();
        assert_eq!(store.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get("b").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn snapshot_survives_reload() {
        let mut store = MemoryStore::new();
        store.put("alice", br#"{"id":"alice"}"#.to_vec()).unwrap();

        let mut buf = Vec::new();
        store.write_snapshot(&mut buf).unwrap();
        let reloaded = MemoryStore::read_snapshot(buf.as_slice()).unwrap();

        assert_eq!(reloaded, store);
    }

    #[test]
    fn snapshot_rejects_binary_values() {
        let mut store = MemoryStore::new();
        store.put("blob", vec![0xff, 0xfe]).unwrap();
        let err = store.write_snapshot(Vec::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotText(key) if key == "blob"));
    }

    #[test]
    fn failed_snapshot_writes_nothing() {
        let mut store = MemoryStore::new();
        store.put("alice", br#"{"id":"alice"}"#.to_vec()).unwrap();
        store.put("blob", vec![0xff]).unwrap();

        let mut buf = Vec::new();
        assert!(store.write_snapshot(&mut buf).is_err());
        assert!(buf.is_empty());
    }
}
