//! Persistence layer for the Attune behavior engine
//!
//! Defines the contract for the durable store that owns interaction history,
//! behavior profiles, and adaptation cache entries across app restarts. The
//! production implementation lives with the backend team; this crate ships
//! [`memory::MemoryGateway`], an in-process implementation used by local-only
//! mode and the test suite.
//!
//! Every call is best-effort from the engine's perspective: a
//! [`crate::AttuneError::SchemaMissing`] result means "feature unavailable,
//! continue local-only" and must not trigger retries.

pub mod memory;

use crate::error::Result;
use crate::recommend::peers::PeerCandidate;
use crate::types::{
    AdaptationCacheEntry, BehaviorProfile, InteractionEvent, TrendingContent, UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable store contract
///
/// The gateway owns the durable copies; the engine owns the in-memory
/// working set. Interaction storage is append-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Ensure a minimal user profile exists; idempotent
    async fn ensure_user_profile(&self, user_id: &str) -> Result<UserProfile>;

    /// Load the most recent interactions for a user, newest last
    async fn load_interactions(&self, user_id: &str, limit: usize)
        -> Result<Vec<InteractionEvent>>;

    /// Append one interaction to the durable log
    async fn append_interaction(&self, user_id: &str, event: &InteractionEvent) -> Result<()>;

    /// Load the stored behavior profile, if any
    async fn load_behavior_profile(&self, user_id: &str) -> Result<Option<BehaviorProfile>>;

    /// Insert or replace the behavior profile
    async fn upsert_behavior_profile(&self, profile: &BehaviorProfile) -> Result<()>;

    /// Load all live adaptation cache entries for a user
    async fn load_adaptation_cache(&self, user_id: &str) -> Result<Vec<AdaptationCacheEntry>>;

    /// Insert or replace one adaptation cache entry.
    ///
    /// The engine performs the read-merge-write; gateway semantics are
    /// last-writer-wins on the entry's signature.
    async fn upsert_adaptation_cache(
        &self,
        user_id: &str,
        entry: &AdaptationCacheEntry,
    ) -> Result<()>;

    /// Delete cache entries with `expires_at < now`; returns how many
    async fn delete_expired_cache(&self, user_id: &str, now: DateTime<Utc>) -> Result<u64>;

    /// Aggregate content interaction counts across the user base over the
    /// trailing `days`, most interacted first
    async fn load_trending_content(&self, days: u32, limit: usize) -> Result<Vec<TrendingContent>>;

    /// Candidate peers for connection matching
    async fn load_peer_candidates(&self, user_id: &str) -> Result<Vec<PeerCandidate>>;
}
