//! Attune - Adaptive Behavior-Learning and Recommendation Engine
//!
//! The engine behind the Attune wellness app's personalized suggestions:
//! - Interaction event recording with session tracking
//! - Rolling preference statistics and behavior pattern learning
//! - Scored, deduplicated activity/content/peer recommendations
//! - Real-time mood-, time-, and stress-sensitive adaptation with a
//!   context-keyed cache
//!
//! # Architecture
//!
//! The pipeline runs leaves-first: context resolution feeds the interaction
//! recorder, whose events drive preference aggregation and pattern learning;
//! the recommendation generator turns patterns (plus optional AI provider
//! suggestions) into scored bundles; the adaptation engine is the terminal,
//! consumer-facing stage. The durable store and the suggestion provider are
//! injected collaborators — the engine always has a local, deterministic
//! fallback for both.
//!
//! # Example
//!
//! ```ignore
//! use attune::{BehaviorEngine, EngineConfig, MemoryGateway, TrackOptions};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let gateway = Arc::new(MemoryGateway::new());
//!     let engine = BehaviorEngine::new("user-1", gateway, None, EngineConfig::default());
//!     engine.load().await;
//!
//!     engine.resolver().observe_mood("calm", 0.8);
//!     engine
//!         .track_interaction("breathing_exercise", Default::default(), TrackOptions::default())
//!         .await;
//!
//!     let bundle = engine.generate_recommendations(Default::default()).await;
//!     let adapted = engine.adapt_recommendations(&bundle, None).await;
//!     println!("{} recommendations", adapted.recommendations.len());
//! }
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod learning;
pub mod recommend;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use context::ContextResolver;
pub use engine::{BehaviorEngine, EngineStatus};
pub use error::{AttuneError, Result};
pub use recommend::{GenerateOptions, PeerCandidate};
pub use services::{SuggestionProvider, SuggestionProviderConfig};
pub use storage::{memory::MemoryGateway, PersistenceGateway};
pub use types::{
    AdaptationCacheEntry, AdaptedBundle, AlertLevel, BehaviorProfile, ContextSnapshot,
    InteractionEvent, MoodReading, Payload, PeerMatch, Priority, Recommendation,
    RecommendationCategory, RecommendationsBundle, SourceTag, TimeOfDay, TrackOptions,
    UserProfile,
};
