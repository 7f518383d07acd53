//! In-memory adapter
//!
//! Plain maps behind a Tokio mutex, sorted on read. Backs the engine
//! test suites and local development without a Redis instance.

use crate::{HashStore, Keyspace, OrderedSetStore, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    zsets: HashMap<String, HashMap<String, i64>>,
    hashes: HashMap<String, HashMap<String, String>>,
}

#[derive(Default)]
pub struct MemoryRankStore {
    inner: Mutex<Inner>,
}

impl MemoryRankStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Entries ordered per the store contract: score descending, ties by
/// member string ascending.
fn sorted_desc(set: &HashMap<String, i64>) -> Vec<(String, i64)> {
    let mut entries: Vec<(String, i64)> = set.iter().map(|(m, s)| (m.clone(), *s)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

fn glob_match(pattern: &str, text: &str) -> bool {
    match pattern.split_once('*') {
        None => pattern == text,
        Some((prefix, rest)) => {
            let Some(remainder) = text.strip_prefix(prefix) else {
                return false;
            };
            if rest.is_empty() {
                return true;
            }
            remainder
                .char_indices()
                .map(|(i, _)| i)
                .chain(std::iter::once(remainder.len()))
                .any(|i| glob_match(rest, &remainder[i..]))
        }
    }
}

#[async_trait]
impl OrderedSetStore for MemoryRankStore {
    async fn add_or_update(&self, key: &str, member: &str, score: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn remove(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .zsets
            .get_mut(key)
            .map(|set| set.remove(member).is_some())
            .unwrap_or(false))
    }

    async fn range_by_rank_desc(
        &self,
        key: &str,
        from: isize,
        to: isize,
    ) -> StoreResult<Vec<(String, i64)>> {
        let inner = self.inner.lock().await;
        let Some(set) = inner.zsets.get(key) else {
            return Ok(Vec::new());
        };
        let entries = sorted_desc(set);
        let from = from.max(0) as usize;
        if from >= entries.len() || to < from as isize {
            return Ok(Vec::new());
        }
        let to = (to as usize).min(entries.len() - 1);
        Ok(entries[from..=to].to_vec())
    }

    async fn range_by_score(&self, key: &str, score: i64) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock().await;
        let Some(set) = inner.zsets.get(key) else {
            return Ok(Vec::new());
        };
        let mut members: Vec<String> = set
            .iter()
            .filter(|(_, s)| **s == score)
            .map(|(m, _)| m.clone())
            .collect();
        members.sort();
        Ok(members)
    }

    async fn rank_desc(&self, key: &str, member: &str) -> StoreResult<Option<u64>> {
        let inner = self.inner.lock().await;
        let Some(set) = inner.zsets.get(key) else {
            return Ok(None);
        };
        Ok(sorted_desc(set)
            .iter()
            .position(|(m, _)| m == member)
            .map(|pos| pos as u64))
    }

    async fn cardinality(&self, key: &str) -> StoreResult<u64> {
        let inner = self.inner.lock().await;
        Ok(inner.zsets.get(key).map(|set| set.len() as u64).unwrap_or(0))
    }
}

#[async_trait]
impl HashStore for MemoryRankStore {
    async fn set_fields(&self, key: &str, fields: &[(String, String)]) -> StoreResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().await;
        let hash = inner.hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn get_fields(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let inner = self.inner.lock().await;
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Keyspace for MemoryRankStore {
    async fn delete_matching(&self, pattern: &str) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.zsets.len() + inner.hashes.len();
        inner.zsets.retain(|key, _| !glob_match(pattern, key));
        inner.hashes.retain(|key, _| !glob_match(pattern, key));
        Ok((before - inner.zsets.len() - inner.hashes.len()) as u64)
    }
}
