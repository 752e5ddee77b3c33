//! An in-process, non-persistent `AnnotationDb`. Grounded on
//! `aero-user/src/storage/in_memory.rs`'s `MemStore`: a sorted map keyed
//! by the raw byte key, with `prefix_last_bound`-style prefix scans.
//!
//! As in the teacher's own doc comment on `MemStore`: this is intended
//! for tests and basic debugging, not for production use — it holds
//! everything in memory and loses all data on process exit.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{AnnotationDb, Entry, Op, Selector, StorageError, Txn};

#[derive(Default)]
pub struct MemStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }
}

fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last == 0xff {
            end.pop();
            continue;
        }
        *last += 1;
        return Some(end);
    }
    None
}

#[async_trait]
impl AnnotationDb for MemStore {
    async fn fetch(&self, select: &Selector) -> Result<Vec<Entry>, StorageError> {
        let data = self.data.read().map_err(|_| StorageError::Internal("poisoned lock".into()))?;
        match select {
            Selector::Single(key) => Ok(data
                .get(key)
                .map(|value| vec![Entry { key: key.clone(), value: value.clone() }])
                .unwrap_or_default()),
            Selector::Prefix(prefix) => {
                let range: Box<dyn Iterator<Item = (&Vec<u8>, &Vec<u8>)>> =
                    match prefix_upper_bound(prefix) {
                        Some(upper) => Box::new(
                            data.range(prefix.clone()..upper)
                        ),
                        None => Box::new(data.range(prefix.clone()..)),
                    };
                Ok(range
                    .map(|(k, v)| Entry { key: k.clone(), value: v.clone() })
                    .collect())
            }
        }
    }

    async fn commit(&self, txn: Txn) -> Result<(), StorageError> {
        let mut data = self.data.write().map_err(|_| StorageError::Internal("poisoned lock".into()))?;
        for op in txn.into_ops() {
            match op {
                Op::Put(k, v) => {
                    data.insert(k, v);
                }
                Op::Delete(k) => {
                    data.remove(&k);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_fetch_single() {
        let db = MemStore::new();
        let mut txn = db.begin();
        txn.put(b"a\0x\0\0".to_vec(), b"1".to_vec());
        db.commit(txn).await.unwrap();

        let got = db.fetch(&Selector::Single(b"a\0x\0\0".to_vec())).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].value, b"1");
    }

    #[tokio::test]
    async fn prefix_scan_is_bounded() {
        let db = MemStore::new();
        let mut txn = db.begin();
        txn.put(b"a\0".to_vec(), b"1".to_vec());
        txn.put(b"a\0x".to_vec(), b"2".to_vec());
        txn.put(b"b\0".to_vec(), b"3".to_vec());
        db.commit(txn).await.unwrap();

        let got = db.fetch(&Selector::Prefix(b"a\0".to_vec())).await.unwrap();
        assert_eq!(got.len(), 2);
    }

    #[tokio::test]
    async fn abort_discards_pending_writes() {
        let db = MemStore::new();
        let mut txn = db.begin();
        txn.put(b"a\0".to_vec(), b"1".to_vec());
        db.abort(txn).await.unwrap();

        let got = db.fetch(&Selector::Prefix(b"a".to_vec())).await.unwrap();
        assert!(got.is_empty());
    }
}
