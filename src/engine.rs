//! The behavior engine: composition root and consumer-facing API.
//!
//! One [`BehaviorEngine`] per user session, constructed with an injected
//! persistence gateway and optional suggestion provider — no global state.
//! The engine owns the in-memory pipeline (recorder, aggregator, learner,
//! generator, adaptation) and orchestrates the external collaborators.
//!
//! # Degradation contract
//!
//! No public method returns an error. Persistence failures log and fall back
//! to local state; provider failures fall back to rule-based scoring; the
//! crisis override works with everything else down. `track_interaction` and
//! `adapt_recommendations` never wait on a durable write.

use crate::config::EngineConfig;
use crate::context::ContextResolver;
use crate::learning::{InteractionRecorder, PatternLearner, PreferenceAggregator};
use crate::recommend::{AdaptationEngine, GenerateOptions, PeerMatcher, RecommendationGenerator};
use crate::services::suggestions::{SuggestionInput, SuggestionProvider};
use crate::storage::PersistenceGateway;
use crate::types::{
    clamp01, AdaptedBundle, BehaviorProfile, ContextSnapshot, InteractionEvent, Payload,
    RecommendationsBundle, TrackOptions, UserProfile,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Mutable engine state for one user session
struct EngineState {
    recorder: InteractionRecorder,
    preferences: PreferenceAggregator,
    profile: Option<BehaviorProfile>,
    adaptation: AdaptationEngine,
}

/// Diagnostic snapshot of the engine (host app status screen)
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub user_id: String,
    pub events_in_window: usize,
    pub total_recorded: u64,
    pub session_id: String,
    pub cache_entries: usize,
    pub profile_updated_at: Option<DateTime<Utc>>,
    pub provider_enabled: bool,
}

/// Adaptive behavior-learning and recommendation engine for one user session
pub struct BehaviorEngine {
    user_id: String,
    config: EngineConfig,
    gateway: Arc<dyn PersistenceGateway>,
    provider: Option<Arc<dyn SuggestionProvider>>,
    resolver: Arc<ContextResolver>,
    generator: RecommendationGenerator,
    state: Arc<RwLock<EngineState>>,
}

impl BehaviorEngine {
    /// Create an engine for `user_id` with injected collaborators.
    ///
    /// Call [`BehaviorEngine::load`] afterwards to merge durable state.
    pub fn new(
        user_id: impl Into<String>,
        gateway: Arc<dyn PersistenceGateway>,
        provider: Option<Arc<dyn SuggestionProvider>>,
        config: EngineConfig,
    ) -> Self {
        let state = EngineState {
            recorder: InteractionRecorder::new(config.recent_window, config.session_gap_minutes),
            preferences: PreferenceAggregator::new(),
            profile: None,
            adaptation: AdaptationEngine::new(),
        };

        Self {
            user_id: user_id.into(),
            resolver: Arc::new(ContextResolver::new(config.mood_freshness_minutes)),
            generator: RecommendationGenerator::new(config.diversity_window),
            gateway,
            provider,
            config,
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Context resolver, exposed so other app surfaces can feed mood and
    /// stress observations
    pub fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    /// Merge durable state into the engine.
    ///
    /// Best-effort per slice: a corrupt or unavailable slice is logged,
    /// reinitialized empty, and startup continues. Never blocks the app on a
    /// persistence problem.
    pub async fn load(&self) {
        if let Err(e) = self.gateway.ensure_user_profile(&self.user_id).await {
            log_persistence("ensure_user_profile", &e);
        }

        match self
            .gateway
            .load_interactions(&self.user_id, self.config.load_limit)
            .await
        {
            Ok(durable) => {
                let mut state = self.state.write().await;
                state.recorder.merge_durable(durable);
                // Rebuild the aggregator by replaying the merged window
                state.preferences.clear();
                let events: Vec<InteractionEvent> = state.recorder.events().cloned().collect();
                for event in &events {
                    state
                        .preferences
                        .update(&event.kind, &event.payload, &event.context);
                }
                info!(
                    "Loaded {} interactions for {}",
                    state.recorder.len(),
                    self.user_id
                );
            }
            Err(e) => log_persistence("load_interactions", &e),
        }

        match self.gateway.load_behavior_profile(&self.user_id).await {
            Ok(profile) => {
                let mut state = self.state.write().await;
                state.profile = profile;
            }
            Err(e) => log_persistence("load_behavior_profile", &e),
        }

        match self.gateway.load_adaptation_cache(&self.user_id).await {
            Ok(entries) => {
                let mut state = self.state.write().await;
                state.adaptation.load_entries(entries, Utc::now());
            }
            Err(e) => log_persistence("load_adaptation_cache", &e),
        }
    }

    /// Record one user interaction.
    ///
    /// Local-first: the event is built and aggregated synchronously; the
    /// durable write runs in the background and its failure never surfaces.
    /// Every `learning_interval`-th call also schedules a background
    /// learning pass and cache sweep.
    pub async fn track_interaction(
        &self,
        kind: &str,
        payload: Payload,
        options: TrackOptions,
    ) -> InteractionEvent {
        let context = options
            .context
            .clone()
            .unwrap_or_else(|| self.resolver.resolve());

        let (event, total) = {
            let mut state = self.state.write().await;
            let event = state.recorder.record(kind, payload, context, &options);
            state
                .preferences
                .update(&event.kind, &event.payload, &event.context);
            (event, state.recorder.total_recorded())
        };

        // Fire-and-forget durable append
        let gateway = Arc::clone(&self.gateway);
        let user_id = self.user_id.clone();
        let to_persist = event.clone();
        tokio::spawn(async move {
            if let Err(e) = gateway.append_interaction(&user_id, &to_persist).await {
                log_persistence("append_interaction", &e);
            }
        });

        if total % self.config.learning_interval == 0 {
            debug!("Interaction #{} triggers a learning pass", total);
            let engine = self.maintenance_handle();
            tokio::spawn(async move {
                engine.run().await;
            });
        }

        event
    }

    /// Generate the full recommendation bundle for the current state.
    ///
    /// Always returns a non-empty activity list: rule-based scoring when
    /// history exists, the generic starter set otherwise. Provider and
    /// gateway failures degrade to the deterministic half of each family.
    pub async fn generate_recommendations(
        &self,
        options: GenerateOptions,
    ) -> RecommendationsBundle {
        let (activities, personalized, events, total, top_kinds) = {
            let state = self.state.read().await;
            let activities = if state.preferences.is_empty() {
                self.generator.starter_set()
            } else {
                self.generator.activity_suggestions(&state.preferences)
            };
            let personalized = self.generator.personalized_content(&state.preferences);
            let events: Vec<InteractionEvent> = state.recorder.events().cloned().collect();
            let total = state.recorder.total_recorded();

            let mut kinds: Vec<(String, u32)> = state
                .preferences
                .records()
                .iter()
                .map(|(k, r)| (k.clone(), r.frequency))
                .collect();
            kinds.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            let top_kinds: Vec<String> = kinds.into_iter().take(5).map(|(k, _)| k).collect();

            (activities, personalized, events, total, top_kinds)
        };

        let context = self.resolver.resolve();
        let input = SuggestionInput {
            user_id: self.user_id.clone(),
            mood_category: context.mood.as_ref().map(|m| m.category().to_string()),
            context,
            top_kinds,
        };

        // Provider calls; each failure independently resolves to None
        let (ai_personalized, ai_content, ai_peers) = match &self.provider {
            Some(provider) => tokio::join!(
                provider.personalized_recommendations(&input),
                provider.content_recommendations(&input),
                provider.peer_recommendations(&input),
            ),
            None => (None, None, None),
        };

        let trending = match self
            .gateway
            .load_trending_content(self.config.trending_days, 5)
            .await
        {
            Ok(trending) => trending,
            Err(e) => {
                log_persistence("load_trending_content", &e);
                Vec::new()
            }
        };

        let mut content_sources = Vec::new();
        if let Some(set) = &ai_content {
            content_sources.push(self.generator.ai_content(set));
        }
        if let Some(set) = &ai_personalized {
            content_sources.push(self.generator.ai_content(set));
        }
        content_sources.push(personalized);
        content_sources.push(self.generator.trending_content(&trending));
        content_sources.push(self.generator.diversity_picks(&events));
        let content = self
            .generator
            .merge_content(content_sources, options.content_limit);

        let peers = if options.include_peers {
            let profile = match self.gateway.ensure_user_profile(&self.user_id).await {
                Ok(profile) => profile,
                Err(e) => {
                    log_persistence("ensure_user_profile", &e);
                    UserProfile {
                        user_id: self.user_id.clone(),
                        ..UserProfile::default()
                    }
                }
            };
            let candidates = match self.gateway.load_peer_candidates(&self.user_id).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    log_persistence("load_peer_candidates", &e);
                    Vec::new()
                }
            };
            let algorithmic = PeerMatcher::matches(&profile, &candidates);
            PeerMatcher::merge_with_ai(ai_peers.unwrap_or_default(), algorithmic)
        } else {
            Vec::new()
        };

        RecommendationsBundle {
            activities,
            content,
            peers,
            confidence: sample_confidence(total),
            generated_at: Utc::now(),
        }
    }

    /// Adapt a base bundle to the current (or given) context.
    ///
    /// Pure local transform plus the adaptation cache; the refreshed cache
    /// entry is persisted in the background.
    pub async fn adapt_recommendations(
        &self,
        base: &RecommendationsBundle,
        context: Option<ContextSnapshot>,
    ) -> AdaptedBundle {
        let context = context.unwrap_or_else(|| self.resolver.resolve());
        let now = Utc::now();

        let (bundle, entry) = {
            let mut state = self.state.write().await;
            let total = state.recorder.total_recorded();
            state.adaptation.adapt(base, &context, total, now)
        };

        let gateway = Arc::clone(&self.gateway);
        let user_id = self.user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = gateway.upsert_adaptation_cache(&user_id, &entry).await {
                log_persistence("upsert_adaptation_cache", &e);
            }
        });

        bundle
    }

    /// Run the learning pass and cache sweep inline.
    ///
    /// Normally scheduled in the background every `learning_interval`
    /// interactions; exposed for composition roots that want a deterministic
    /// flush (for instance before process exit).
    pub async fn run_maintenance(&self) {
        self.maintenance_handle().run().await;
    }

    /// Latest learned behavior profile, if a learning pass has run
    pub async fn behavior_profile(&self) -> Option<BehaviorProfile> {
        self.state.read().await.profile.clone()
    }

    /// Diagnostic snapshot for the host app
    pub async fn status(&self) -> EngineStatus {
        let state = self.state.read().await;
        EngineStatus {
            user_id: self.user_id.clone(),
            events_in_window: state.recorder.len(),
            total_recorded: state.recorder.total_recorded(),
            session_id: state.recorder.session_id().to_string(),
            cache_entries: state.adaptation.len(),
            profile_updated_at: state.profile.as_ref().map(|p| p.updated_at),
            provider_enabled: self.provider.is_some(),
        }
    }

    fn maintenance_handle(&self) -> MaintenancePass {
        MaintenancePass {
            user_id: self.user_id.clone(),
            gateway: Arc::clone(&self.gateway),
            state: Arc::clone(&self.state),
            learner: PatternLearner::new(self.config.session_gap_minutes),
            default_adaptation: self.config.adaptation.clone(),
        }
    }
}

/// One scheduled learning + cleanup pass.
///
/// Self-contained so it can be spawned without borrowing the engine; every
/// failure inside is logged and dropped, never rethrown. Safe to abandon
/// mid-flight: state updates happen under the lock in one step, and the
/// durable writes are idempotent upserts.
struct MaintenancePass {
    user_id: String,
    gateway: Arc<dyn PersistenceGateway>,
    state: Arc<RwLock<EngineState>>,
    learner: PatternLearner,
    default_adaptation: crate::types::AdaptationSettings,
}

impl MaintenancePass {
    async fn run(self) {
        let now = Utc::now();

        let profile = {
            let mut state = self.state.write().await;
            let events: Vec<InteractionEvent> = state.recorder.events().cloned().collect();
            let patterns = self.learner.derive(&events, &state.preferences);

            let profile = BehaviorProfile {
                user_id: self.user_id.clone(),
                patterns,
                adaptation: state
                    .profile
                    .as_ref()
                    .map(|p| p.adaptation.clone())
                    .unwrap_or_else(|| self.default_adaptation.clone()),
                interaction_count: state.recorder.total_recorded(),
                updated_at: now,
            };
            state.profile = Some(profile.clone());

            let purged = state.adaptation.purge_expired(now);
            if purged > 0 {
                debug!("Purged {} expired local cache entries", purged);
            }
            profile
        };

        if let Err(e) = self.gateway.upsert_behavior_profile(&profile).await {
            log_persistence("upsert_behavior_profile", &e);
        }
        if let Err(e) = self.gateway.delete_expired_cache(&self.user_id, now).await {
            log_persistence("delete_expired_cache", &e);
        }

        info!(
            "Learning pass complete for {} ({} interactions)",
            self.user_id, profile.interaction_count
        );
    }
}

/// Bundle confidence from the number of observed interactions.
///
/// Sigmoid centered at 10 samples: ~0.12 with no history, 0.5 at 10,
/// ~0.88 at 20, approaching 1.0 past 50.
fn sample_confidence(samples: u64) -> f32 {
    let x = (samples as f32 - 10.0) / 5.0;
    clamp01(1.0 / (1.0 + (-x).exp()))
}

/// Shared logging policy for gateway failures: schema-missing degrades
/// quietly, everything else warns. No retries in either case.
fn log_persistence(operation: &str, error: &crate::AttuneError) {
    if error.is_degraded_mode() {
        debug!("{} unavailable, continuing local-only: {}", operation, error);
    } else {
        warn!("{} failed, continuing with local state: {}", operation, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttuneError;
    use crate::storage::MockPersistenceGateway;

    fn failing_gateway() -> MockPersistenceGateway {
        let mut mock = MockPersistenceGateway::new();
        mock.expect_ensure_user_profile()
            .returning(|_| Err(AttuneError::Persistence("down".into())));
        mock.expect_load_interactions()
            .returning(|_, _| Err(AttuneError::Persistence("down".into())));
        mock.expect_append_interaction()
            .returning(|_, _| Err(AttuneError::Persistence("down".into())));
        mock.expect_load_behavior_profile()
            .returning(|_| Err(AttuneError::SchemaMissing("behavior_profiles".into())));
        mock.expect_upsert_behavior_profile()
            .returning(|_| Err(AttuneError::Persistence("down".into())));
        mock.expect_load_adaptation_cache()
            .returning(|_| Err(AttuneError::SchemaMissing("adaptation_cache".into())));
        mock.expect_upsert_adaptation_cache()
            .returning(|_, _| Err(AttuneError::Persistence("down".into())));
        mock.expect_delete_expired_cache()
            .returning(|_, _| Err(AttuneError::Persistence("down".into())));
        mock.expect_load_trending_content()
            .returning(|_, _| Err(AttuneError::Persistence("down".into())));
        mock.expect_load_peer_candidates()
            .returning(|_| Err(AttuneError::Persistence("down".into())));
        mock
    }

    #[tokio::test]
    async fn test_track_interaction_survives_gateway_failure() {
        let engine = BehaviorEngine::new(
            "u1",
            Arc::new(failing_gateway()),
            None,
            EngineConfig::default(),
        );
        engine.load().await;

        let event = engine
            .track_interaction("breathing_exercise", Payload::new(), TrackOptions::default())
            .await;

        assert_eq!(event.kind, "breathing_exercise");
        assert_eq!(engine.status().await.total_recorded, 1);
    }

    #[tokio::test]
    async fn test_generate_with_everything_down_returns_starter_set() {
        let engine = BehaviorEngine::new(
            "u1",
            Arc::new(failing_gateway()),
            None,
            EngineConfig::default(),
        );

        let bundle = engine.generate_recommendations(GenerateOptions::default()).await;

        assert!(!bundle.activities.is_empty());
        for rec in bundle.activities.iter().chain(bundle.content.iter()) {
            assert!((0.0..=1.0).contains(&rec.score));
        }
    }

    #[tokio::test]
    async fn test_maintenance_pass_contained_failure() {
        let engine = BehaviorEngine::new(
            "u1",
            Arc::new(failing_gateway()),
            None,
            EngineConfig::default(),
        );
        engine
            .track_interaction("walk", Payload::new(), TrackOptions::default())
            .await;

        // The pass itself must not panic or propagate the gateway errors
        engine.run_maintenance().await;
        assert!(engine.behavior_profile().await.is_some());
    }

    #[test]
    fn test_sample_confidence_curve() {
        assert!(sample_confidence(0) < 0.2);
        assert!((sample_confidence(10) - 0.5).abs() < 0.01);
        assert!(sample_confidence(20) > 0.8);
        assert!(sample_confidence(100) > 0.95);
    }
}
