//! AI suggestion provider integration
//!
//! Provides the optional external half of recommendation generation:
//! - Personalized activity suggestions
//! - Content recommendations
//! - Peer connection suggestions
//! - Contextual adaptations
//!
//! The provider is advisory only. Every method returns `Option`: a timeout,
//! transport failure, or malformed response resolves to `None` at this
//! boundary, and the engine's deterministic fallback takes over. No failure
//! here may ever propagate upward.

use crate::types::{clamp01, ContextSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Input handed to the suggestion provider
///
/// A compact summary of the user's situation — no raw interaction payloads
/// leave the engine.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionInput {
    /// Owning user
    pub user_id: String,

    /// Current context snapshot
    pub context: ContextSnapshot,

    /// Most-used interaction kinds, most frequent first
    pub top_kinds: Vec<String>,

    /// Normalized mood category, if a fresh reading exists
    pub mood_category: Option<String>,
}

/// One provider suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Suggested interaction/content kind
    pub kind: String,

    /// Provider score (0.0 - 1.0)
    pub score: f32,

    /// Provider-supplied explanation
    pub reason: String,
}

/// A set of provider suggestions with overall confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub suggestions: Vec<Suggestion>,

    /// Provider confidence in the set (0.0 - 1.0)
    pub confidence: f32,
}

impl SuggestionSet {
    /// Clamp all scores into [0, 1]; malformed provider data never leaks
    /// out-of-range values into the engine
    fn sanitized(mut self) -> Self {
        self.confidence = clamp01(self.confidence);
        for s in &mut self.suggestions {
            s.score = clamp01(s.score);
        }
        self
    }
}

/// One provider peer suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSuggestion {
    /// Suggested peer id
    pub peer_id: String,

    /// Provider compatibility estimate (0.0 - 1.0)
    pub score: f32,

    /// Provider-supplied explanation
    pub reason: String,
}

/// Optional AI suggestion provider contract
///
/// Implementations must not error: any failure resolves to `None`.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Personalized activity suggestions
    async fn personalized_recommendations(&self, input: &SuggestionInput)
        -> Option<SuggestionSet>;

    /// Content recommendations
    async fn content_recommendations(&self, input: &SuggestionInput) -> Option<SuggestionSet>;

    /// Peer connection suggestions
    async fn peer_recommendations(&self, input: &SuggestionInput) -> Option<Vec<PeerSuggestion>>;

    /// Context-specific adaptations for the current situation
    async fn contextual_adaptations(&self, input: &SuggestionInput) -> Option<SuggestionSet>;
}

/// Configuration for the HTTP suggestion provider
#[derive(Debug, Clone)]
pub struct SuggestionProviderConfig {
    /// Base URL of the suggestion service
    pub base_url: String,

    /// Bearer token for the service
    pub api_key: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for SuggestionProviderConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("ATTUNE_SUGGESTIONS_URL").unwrap_or_default(),
            api_key: std::env::var("ATTUNE_SUGGESTIONS_KEY").unwrap_or_default(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP JSON client for the hosted suggestion service
pub struct HttpSuggestionProvider {
    config: SuggestionProviderConfig,
    client: reqwest::Client,
}

impl HttpSuggestionProvider {
    /// Create a provider client; returns `None` when no base URL is
    /// configured (the engine then runs rule-based only)
    pub fn new(config: SuggestionProviderConfig) -> Option<Self> {
        if config.base_url.is_empty() {
            debug!("No suggestion service configured, provider disabled");
            return None;
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .ok()?;

        Some(Self { config, client })
    }

    /// POST `input` to `path`, decoding the JSON response.
    ///
    /// All transport and decode failures collapse to `None` here — this is
    /// the provider-unavailable boundary.
    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        input: &SuggestionInput,
    ) -> Option<T> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);

        let response = match self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(input)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Suggestion request to {} failed: {}", path, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Suggestion service returned {} for {}", response.status(), path);
            return None;
        }

        match response.json::<T>().await {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Malformed suggestion response from {}: {}", path, e);
                None
            }
        }
    }
}

#[async_trait]
impl SuggestionProvider for HttpSuggestionProvider {
    async fn personalized_recommendations(
        &self,
        input: &SuggestionInput,
    ) -> Option<SuggestionSet> {
        self.post::<SuggestionSet>("v1/suggestions/personalized", input)
            .await
            .map(SuggestionSet::sanitized)
    }

    async fn content_recommendations(&self, input: &SuggestionInput) -> Option<SuggestionSet> {
        self.post::<SuggestionSet>("v1/suggestions/content", input)
            .await
            .map(SuggestionSet::sanitized)
    }

    async fn peer_recommendations(&self, input: &SuggestionInput) -> Option<Vec<PeerSuggestion>> {
        let peers: Vec<PeerSuggestion> = self.post("v1/suggestions/peers", input).await?;
        Some(
            peers
                .into_iter()
                .map(|mut p| {
                    p.score = clamp01(p.score);
                    p
                })
                .collect(),
        )
    }

    async fn contextual_adaptations(&self, input: &SuggestionInput) -> Option<SuggestionSet> {
        self.post::<SuggestionSet>("v1/suggestions/contextual", input)
            .await
            .map(SuggestionSet::sanitized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_base_url() {
        let config = SuggestionProviderConfig {
            base_url: String::new(),
            api_key: "k".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(HttpSuggestionProvider::new(config).is_none());
    }

    #[test]
    fn test_sanitize_clamps_scores() {
        let set = SuggestionSet {
            suggestions: vec![
                Suggestion { kind: "meditation".into(), score: 1.8, reason: "r".into() },
                Suggestion { kind: "walk".into(), score: -0.2, reason: "r".into() },
            ],
            confidence: 2.0,
        }
        .sanitized();

        assert!((set.confidence - 1.0).abs() < f32::EPSILON);
        assert!((set.suggestions[0].score - 1.0).abs() < f32::EPSILON);
        assert!((set.suggestions[1].score - 0.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_unreachable_service_resolves_to_none() {
        let provider = HttpSuggestionProvider::new(SuggestionProviderConfig {
            // Reserved TEST-NET address: nothing listens here
            base_url: "http://192.0.2.1:9".into(),
            api_key: "k".into(),
            timeout: Duration::from_millis(50),
        })
        .unwrap();

        let input = SuggestionInput {
            user_id: "u1".into(),
            context: crate::context::ContextResolver::new(90).resolve(),
            top_kinds: vec![],
            mood_category: None,
        };

        assert!(provider.personalized_recommendations(&input).await.is_none());
        assert!(provider.peer_recommendations(&input).await.is_none());
    }
}
