//! Per-session proxy ticket cache.
//!
//! Each backend node needs its own proxy ticket. Entries live as long as the
//! session and are never evicted; a fresh fetch simply overwrites the node's
//! entry.

use mailgate_core::{BackendNode, ProxyTicket};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Proxy tickets keyed by backend node.
///
/// Clones share the same entries. Concurrent writers for the same node
/// race; the last write wins, since tickets for one node are
/// interchangeable while valid.
#[derive(Debug, Clone, Default)]
pub struct TicketCache {
    entries: Arc<RwLock<HashMap<BackendNode, ProxyTicket>>>,
}

impl TicketCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached ticket for `node`.
    pub async fn get(&self, node: &BackendNode) -> Option<ProxyTicket> {
        self.entries.read().await.get(node).cloned()
    }

    /// Caches `ticket` for `node`, replacing any previous entry.
    pub async fn put(&self, node: BackendNode, ticket: ProxyTicket) {
        self.entries.write().await.insert(node, ticket);
    }

    /// Returns the number of cached nodes.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(raw: &str) -> BackendNode {
        BackendNode::new(raw).unwrap()
    }

    fn ticket(raw: &str) -> ProxyTicket {
        ProxyTicket::new(raw).unwrap()
    }

    #[tokio::test]
    async fn entries_are_scoped_per_node() {
        let cache = TicketCache::new();
        cache.put(node("imap-a"), ticket("PT-a")).await;

        assert_eq!(cache.get(&node("imap-a")).await, Some(ticket("PT-a")));
        assert_eq!(cache.get(&node("imap-b")).await, None);
    }

    #[tokio::test]
    async fn put_overwrites() {
        let cache = TicketCache::new();
        cache.put(node("imap-a"), ticket("PT-1")).await;
        cache.put(node("imap-a"), ticket("PT-2")).await;

        assert_eq!(cache.get(&node("imap-a")).await, Some(ticket("PT-2")));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_writers_leave_one_entry() {
        let cache = TicketCache::new();
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache.put(node("imap-a"), ticket(&format!("PT-{i}"))).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.len().await, 1);
        let cached = cache.get(&node("imap-a")).await.unwrap();
        assert!(cached.as_str().starts_with("PT-"));
    }

    #[tokio::test]
    async fn new_cache_is_empty() {
        assert!(TicketCache::new().is_empty().await);
    }
}
