//! Behavior learning pipeline: event recording, preference aggregation, and
//! pattern derivation.
//!
//! This module implements the statistical half of the engine. It tracks user
//! interaction events and distills them into rolling preference records and
//! higher-level behavior patterns that the recommendation stages consume.
//!
//! # Architecture
//!
//! - **InteractionRecorder**: bounded append-only window of recent events
//!   with 30-minute-gap session bookkeeping
//! - **PreferenceAggregator**: rolling per-kind statistics (frequency,
//!   recency, per-context counts, effectiveness, rating)
//! - **PatternLearner**: derives time, content, mood, engagement, and
//!   contextual patterns from the window + preference records
//!
//! "Learning" here is deliberately modest: statistical aggregation and
//! rule-based scoring over a bounded history. No model is trained.
//!
//! # Degradation
//!
//! Every stage is local and infallible from the caller's point of view: the
//! recorder never loses an event to a persistence failure, and a failed
//! pattern slice degrades to an empty map instead of aborting the pass.

pub mod patterns;
pub mod preferences;
pub mod recorder;

pub use patterns::{BehaviorPatterns, ContentStats, ContextualPatterns, EngagementPatterns, PatternLearner};
pub use preferences::{PreferenceAggregator, PreferenceRecord};
pub use recorder::InteractionRecorder;
