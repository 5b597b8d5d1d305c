//! Recommendation pipeline: generation, peer matching, and real-time
//! adaptation.
//!
//! # Architecture
//!
//! - **RecommendationGenerator**: turns preference records, trending data,
//!   and optional AI suggestions into scored activity/content sets with
//!   rule-based fallback for every source
//! - **PeerMatcher**: multi-signal compatibility scoring between the user
//!   and candidate peers
//! - **AdaptationEngine**: applies mood/time/stress adjustments to a base
//!   bundle and maintains the context-keyed adaptation cache
//!
//! Every stage degrades gracefully: provider gone means rule-based only,
//! empty history means the generic starter set, and the crisis override in
//! the adaptation engine is a pure local rule that works with every external
//! collaborator down.

pub mod adaptation;
pub mod generator;
pub mod peers;

pub use adaptation::AdaptationEngine;
pub use generator::{GenerateOptions, RecommendationGenerator};
pub use peers::{PeerCandidate, PeerMatcher};
