use std::collections::HashMap;
use std::sync::Mutex;

/// Key-value store seam for the remote registry cache. The durable
/// implementation is supplied by the embedding system; [`MemKvStore`] backs
/// tests and cache-less deployments.
pub trait KvStore: Send + Sync {
    fn init(&self) -> anyhow::Result<()>;
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn close(&self);
}

#[derive(Default)]
pub struct MemKvStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemKvStore {
    fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().expect("kvstore poisoned").get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.entries.lock().expect("kvstore poisoned").insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn close(&self) {}
}
