//! In-process implementation of the persistence gateway.
//!
//! Used by local-only mode (durable backend not reachable or not yet
//! provisioned) and by the integration tests. Honors the same contract as
//! the production store: append-only interaction log, last-writer-wins cache
//! upserts, expiry sweep.

use crate::error::Result;
use crate::recommend::peers::PeerCandidate;
use crate::storage::PersistenceGateway;
use crate::types::{
    AdaptationCacheEntry, BehaviorProfile, InteractionEvent, TrendingContent, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Store {
    profiles: HashMap<String, UserProfile>,
    interactions: HashMap<String, Vec<InteractionEvent>>,
    behavior_profiles: HashMap<String, BehaviorProfile>,
    // user -> signature -> entry
    cache: HashMap<String, HashMap<String, AdaptationCacheEntry>>,
    trending: Vec<TrendingContent>,
    peers: HashMap<String, Vec<PeerCandidate>>,
}

/// In-memory persistence gateway
#[derive(Default)]
pub struct MemoryGateway {
    store: RwLock<Store>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the trending-content aggregate (test/demo hook)
    pub async fn seed_trending(&self, trending: Vec<TrendingContent>) {
        self.store.write().await.trending = trending;
    }

    /// Seed peer candidates for a user (test/demo hook)
    pub async fn seed_peers(&self, user_id: &str, peers: Vec<PeerCandidate>) {
        self.store.write().await.peers.insert(user_id.to_string(), peers);
    }

    /// Seed a user profile with matching traits (test/demo hook)
    pub async fn seed_profile(&self, profile: UserProfile) {
        self.store
            .write()
            .await
            .profiles
            .insert(profile.user_id.clone(), profile);
    }

    /// Number of durably stored interactions for a user
    pub async fn interaction_count(&self, user_id: &str) -> usize {
        self.store
            .read()
            .await
            .interactions
            .get(user_id)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PersistenceGateway for MemoryGateway {
    async fn ensure_user_profile(&self, user_id: &str) -> Result<UserProfile> {
        let mut store = self.store.write().await;
        let profile = store
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile {
                user_id: user_id.to_string(),
                ..UserProfile::default()
            });
        Ok(profile.clone())
    }

    async fn load_interactions(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<InteractionEvent>> {
        let store = self.store.read().await;
        let events = store.interactions.get(user_id).cloned().unwrap_or_default();
        let skip = events.len().saturating_sub(limit);
        Ok(events.into_iter().skip(skip).collect())
    }

    async fn append_interaction(&self, user_id: &str, event: &InteractionEvent) -> Result<()> {
        let mut store = self.store.write().await;
        store
            .interactions
            .entry(user_id.to_string())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn load_behavior_profile(&self, user_id: &str) -> Result<Option<BehaviorProfile>> {
        Ok(self.store.read().await.behavior_profiles.get(user_id).cloned())
    }

    async fn upsert_behavior_profile(&self, profile: &BehaviorProfile) -> Result<()> {
        self.store
            .write()
            .await
            .behavior_profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn load_adaptation_cache(&self, user_id: &str) -> Result<Vec<AdaptationCacheEntry>> {
        let store = self.store.read().await;
        Ok(store
            .cache
            .get(user_id)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_adaptation_cache(
        &self,
        user_id: &str,
        entry: &AdaptationCacheEntry,
    ) -> Result<()> {
        self.store
            .write()
            .await
            .cache
            .entry(user_id.to_string())
            .or_default()
            .insert(entry.signature.clone(), entry.clone());
        Ok(())
    }

    async fn delete_expired_cache(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64> {
        let mut store = self.store.write().await;
        let Some(entries) = store.cache.get_mut(user_id) else {
            return Ok(0);
        };
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = (before - entries.len()) as u64;
        if purged > 0 {
            debug!("Purged {} expired cache entries for {}", purged, user_id);
        }
        Ok(purged)
    }

    async fn load_trending_content(
        &self,
        _days: u32,
        limit: usize,
    ) -> Result<Vec<TrendingContent>> {
        let store = self.store.read().await;
        let mut trending = store.trending.clone();
        trending.sort_by(|a, b| b.interactions.cmp(&a.interactions));
        trending.truncate(limit);
        Ok(trending)
    }

    async fn load_peer_candidates(&self, user_id: &str) -> Result<Vec<PeerCandidate>> {
        Ok(self.store.read().await.peers.get(user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContextSnapshot, EventId, Payload, TimeOfDay};
    use chrono::{Duration, Weekday};

    fn event(ts: DateTime<Utc>) -> InteractionEvent {
        InteractionEvent {
            id: EventId::new(),
            kind: "walk".into(),
            payload: Payload::new(),
            timestamp: ts,
            context: ContextSnapshot {
                time_of_day: TimeOfDay::Morning,
                day_of_week: Weekday::Mon,
                hour: 9,
                mood: None,
                stress_level: None,
                anxiety_level: None,
                timestamp: ts,
            },
            session_id: "s".into(),
            effectiveness_score: None,
            user_rating: None,
        }
    }

    #[tokio::test]
    async fn test_ensure_user_profile_idempotent() {
        let gateway = MemoryGateway::new();
        let a = gateway.ensure_user_profile("u1").await.unwrap();
        let b = gateway.ensure_user_profile("u1").await.unwrap();
        assert_eq!(a.user_id, b.user_id);
    }

    #[tokio::test]
    async fn test_interactions_append_only_with_limit() {
        let gateway = MemoryGateway::new();
        let now = Utc::now();
        for i in 0..5 {
            gateway
                .append_interaction("u1", &event(now + Duration::minutes(i)))
                .await
                .unwrap();
        }

        let loaded = gateway.load_interactions("u1", 3).await.unwrap();
        assert_eq!(loaded.len(), 3);
        // Newest retained
        assert_eq!(loaded.last().unwrap().timestamp, now + Duration::minutes(4));
        assert_eq!(gateway.interaction_count("u1").await, 5);
    }

    #[tokio::test]
    async fn test_cache_upsert_and_expiry_sweep() {
        let gateway = MemoryGateway::new();
        let now = Utc::now();

        let live = AdaptationCacheEntry::new("morning:mon:none".into(), 0.5, vec![], now);
        let mut dead = AdaptationCacheEntry::new("night:sun:none".into(), 0.5, vec![], now);
        dead.expires_at = now - Duration::hours(1);

        gateway.upsert_adaptation_cache("u1", &live).await.unwrap();
        gateway.upsert_adaptation_cache("u1", &dead).await.unwrap();

        let purged = gateway.delete_expired_cache("u1", now).await.unwrap();
        assert_eq!(purged, 1);

        let remaining = gateway.load_adaptation_cache("u1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].signature, "morning:mon:none");
    }

    #[tokio::test]
    async fn test_trending_sorted_and_limited() {
        let gateway = MemoryGateway::new();
        gateway
            .seed_trending(vec![
                TrendingContent { kind: "a".into(), interactions: 3 },
                TrendingContent { kind: "b".into(), interactions: 9 },
                TrendingContent { kind: "c".into(), interactions: 5 },
            ])
            .await;

        let trending = gateway.load_trending_content(7, 2).await.unwrap();
        assert_eq!(trending.len(), 2);
        assert_eq!(trending[0].kind, "b");
        assert_eq!(trending[1].kind, "c");
    }
}
