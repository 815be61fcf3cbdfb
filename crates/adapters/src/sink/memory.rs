//! In-memory sink.

use async_trait::async_trait;
use dashmap::DashMap;
use inventory_listener_core::{HostId, StoredHost};

use super::{HostSink, Result};

/// Sink keeping records in a concurrent map.
///
/// Useful for local runs and tests; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemorySink {
    hosts: DashMap<HostId, StoredHost>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether no record is stored.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Snapshot of all records, ordered by id.
    pub fn records(&self) -> Vec<StoredHost> {
        let mut records: Vec<StoredHost> =
            self.hosts.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by_key(|host| host.id);
        records
    }
}

#[async_trait]
impl HostSink for MemorySink {
    async fn insert(&self, host: StoredHost) -> Result<()> {
        self.hosts.insert(host.id, host);
        Ok(())
    }

    async fn get(&self, id: HostId) -> Result<Option<StoredHost>> {
        Ok(self.hosts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn delete_all(&self) -> Result<u64> {
        let removed = self.hosts.len() as u64;
        self.hosts.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn host(id: HostId, request: &str) -> StoredHost {
        StoredHost {
            id,
            request: request.to_string(),
            checksum: "00".to_string(),
            updated: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let sink = MemorySink::new();
        sink.insert(host(1, "a")).await.unwrap();

        let stored = sink.get(1).await.unwrap().unwrap();
        assert_eq!(stored.request, "a");
        assert!(sink.get(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_overwrites_same_id() {
        let sink = MemorySink::new();
        sink.insert(host(1, "old")).await.unwrap();
        sink.insert(host(1, "new")).await.unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get(1).await.unwrap().unwrap().request, "new");
    }

    #[tokio::test]
    async fn test_delete_all() {
        let sink = MemorySink::new();
        sink.insert(host(2, "b")).await.unwrap();
        sink.insert(host(1, "a")).await.unwrap();
        assert_eq!(
            sink.records().iter().map(|h| h.id).collect::<Vec<_>>(),
            vec![1, 2]
        );

        assert_eq!(sink.delete_all().await.unwrap(), 2);
        assert!(sink.is_empty());
    }
}
