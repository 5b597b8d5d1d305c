//! Scored recommendation generation with multi-source merge.
//!
//! Activity scores blend four preference signals with fixed weights:
//! `0.3 * frequency + 0.4 * completion + 0.2 * effectiveness + 0.1 * rating`.
//! Content recommendations merge four sources — AI suggestions, personalized
//! scoring, community trending, and diversity picks — averaging scores where
//! kinds overlap. Every source is optional; the rule-based half always runs.

use crate::learning::preferences::{PreferenceAggregator, PreferenceRecord};
use crate::services::suggestions::SuggestionSet;
use crate::types::{
    clamp01, InteractionEvent, Recommendation, RecommendationCategory, SourceTag, TrendingContent,
};
use tracing::debug;

/// Content kinds the app can surface, used for diversity picks and the
/// starter set
pub const CONTENT_CATALOG: &[&str] = &[
    "breathing_exercise",
    "meditation",
    "mindfulness",
    "journaling",
    "gratitude_practice",
    "sleep_story",
    "calming_music",
    "nature_sounds",
    "movement_break",
    "social_activity",
];

/// Scoring weights for activity suggestions
const W_FREQUENCY: f32 = 0.3;
const W_COMPLETION: f32 = 0.4;
const W_EFFECTIVENESS: f32 = 0.2;
const W_RATING: f32 = 0.1;

/// Options for one generation pass
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Whether to compute peer recommendations
    pub include_peers: bool,

    /// Maximum content recommendations returned
    pub content_limit: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            include_peers: true,
            content_limit: 10,
        }
    }
}

/// Rule-based recommendation generator
pub struct RecommendationGenerator {
    diversity_window: usize,
}

impl RecommendationGenerator {
    /// Create a generator whose diversity picker inspects the last
    /// `diversity_window` interactions
    pub fn new(diversity_window: usize) -> Self {
        Self { diversity_window }
    }

    /// Top-3 activity suggestions from preference records
    pub fn activity_suggestions(&self, preferences: &PreferenceAggregator) -> Vec<Recommendation> {
        let mut scored: Vec<Recommendation> = preferences
            .records()
            .iter()
            .map(|(kind, record)| {
                let (score, reason) = score_record(record);
                Recommendation::rule(RecommendationCategory::Activity, kind.clone(), score, reason)
            })
            .collect();

        sort_descending(&mut scored);
        scored.truncate(3);
        scored
    }

    /// Personalized content scores (same formula, content category)
    pub fn personalized_content(&self, preferences: &PreferenceAggregator) -> Vec<Recommendation> {
        let mut scored: Vec<Recommendation> = preferences
            .records()
            .iter()
            .map(|(kind, record)| {
                let (score, reason) = score_record(record);
                Recommendation::rule(RecommendationCategory::Content, kind.clone(), score, reason)
            })
            .collect();
        sort_descending(&mut scored);
        scored
    }

    /// Community trending content, scored by normalized interaction count
    pub fn trending_content(&self, trending: &[TrendingContent]) -> Vec<Recommendation> {
        let max = trending.iter().map(|t| t.interactions).max().unwrap_or(0);
        if max == 0 {
            return Vec::new();
        }

        trending
            .iter()
            .map(|t| {
                let normalized = t.interactions as f32 / max as f32;
                Recommendation::rule(
                    RecommendationCategory::Content,
                    t.kind.clone(),
                    0.3 + 0.4 * normalized,
                    "Popular with the community this week",
                )
            })
            .collect()
    }

    /// Catalog kinds absent from the recent window, to counter filter bubbles
    pub fn diversity_picks(&self, recent_events: &[InteractionEvent]) -> Vec<Recommendation> {
        let recent_kinds: Vec<&str> = recent_events
            .iter()
            .rev()
            .take(self.diversity_window)
            .map(|e| e.kind.as_str())
            .collect();

        CONTENT_CATALOG
            .iter()
            .filter(|kind| !recent_kinds.contains(kind))
            .map(|kind| {
                Recommendation::rule(
                    RecommendationCategory::Content,
                    *kind,
                    0.35,
                    "Something new to explore",
                )
            })
            .collect()
    }

    /// Map a provider suggestion set into recommendations
    pub fn ai_content(&self, set: &SuggestionSet) -> Vec<Recommendation> {
        set.suggestions
            .iter()
            .map(|s| Recommendation {
                category: RecommendationCategory::Content,
                kind: s.kind.clone(),
                score: clamp01(s.score),
                reason: s.reason.clone(),
                priority: crate::types::Priority::Medium,
                source: SourceTag::Ai,
            })
            .collect()
    }

    /// Merge content sources.
    ///
    /// Sources fold left-to-right: an overlapping kind averages its score
    /// with the existing entry (keeping the metadata of whichever scored
    /// higher); new kinds append. The final list is sorted by score
    /// descending.
    pub fn merge_content(
        &self,
        sources: Vec<Vec<Recommendation>>,
        limit: usize,
    ) -> Vec<Recommendation> {
        let mut merged: Vec<Recommendation> = Vec::new();

        for source in sources {
            for incoming in source {
                match merged.iter_mut().find(|r| r.kind == incoming.kind) {
                    Some(existing) => {
                        let averaged = (existing.score + incoming.score) / 2.0;
                        if incoming.score > existing.score {
                            *existing = incoming;
                        }
                        existing.score = clamp01(averaged);
                    }
                    None => merged.push(incoming),
                }
            }
        }

        sort_descending(&mut merged);
        merged.truncate(limit);
        debug!("Merged content recommendations: {} kinds", merged.len());
        merged
    }

    /// Generic starter set for users with no interaction history
    pub fn starter_set(&self) -> Vec<Recommendation> {
        vec![
            Recommendation::rule(
                RecommendationCategory::Activity,
                "breathing_exercise",
                0.6,
                "A gentle way to get started",
            ),
            Recommendation::rule(
                RecommendationCategory::Activity,
                "journaling",
                0.55,
                "Capture how today went",
            ),
            Recommendation::rule(
                RecommendationCategory::Activity,
                "mindfulness",
                0.5,
                "A short grounding practice",
            ),
        ]
    }
}

/// Score one preference record and derive the dominant-term reason.
///
/// Reason selection follows the fixed priority order completion > rating >
/// effectiveness > frequency: the highest weighted contribution wins, ties
/// resolve toward the earlier term.
fn score_record(record: &PreferenceRecord) -> (f32, String) {
    let frequency_norm = (record.frequency as f32 / 10.0).min(1.0);
    let completion = record.completion_rate();
    let effectiveness = record.effectiveness;
    let rating_norm = clamp01(record.user_rating / 5.0);

    let contributions = [
        (
            W_COMPLETION * completion,
            format!("You complete this {:.0}% of the time", completion * 100.0),
        ),
        (
            W_RATING * rating_norm,
            format!("You rated this {:.0} out of 5", record.user_rating),
        ),
        (
            W_EFFECTIVENESS * effectiveness,
            "This has been working well for you".to_string(),
        ),
        (
            W_FREQUENCY * frequency_norm,
            "One of your most frequent activities".to_string(),
        ),
    ];

    let score: f32 = contributions.iter().map(|(c, _)| *c).sum();

    let mut best = 0;
    for (i, (contribution, _)) in contributions.iter().enumerate().skip(1) {
        if *contribution > contributions[best].0 {
            best = i;
        }
    }
    let reason = contributions[best].1.clone();

    (clamp01(score), reason)
}

/// Sort by score descending with a stable kind tie-break
fn sort_descending(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.kind.cmp(&b.kind))
    });
}
