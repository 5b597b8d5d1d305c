//! Pattern derivation from the event window and preference records.
//!
//! Produces [`BehaviorPatterns`]: time preferences, content preferences,
//! mood-based preferences, session/engagement patterns, and contextual
//! (time x mood x day) combinations. Each sub-analysis is contained — a
//! failing slice degrades to its empty default and the pass continues, so a
//! single bad slice never costs the whole learning update.

use crate::error::Result;
use crate::learning::preferences::PreferenceAggregator;
use crate::types::{weekday_str, InteractionEvent};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Per-kind content statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentStats {
    /// Total uses
    pub frequency: u32,

    /// Rolling effectiveness (0.0 - 1.0)
    pub effectiveness: f32,

    /// Most recent explicit rating (1-5; 0.0 until rated)
    pub user_rating: f32,

    /// completed_count / frequency
    pub completion_rate: f32,
}

/// Session-level engagement statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementPatterns {
    /// Number of distinct sessions in the window
    pub session_count: u32,

    /// Mean session length in minutes (first to last event)
    pub avg_session_minutes: f32,

    /// Per-kind engagement score: 0.7 * completion_rate + 0.3 * avg_rating/5
    pub engagement_scores: HashMap<String, f32>,
}

/// Joint context distributions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextualPatterns {
    /// Counts keyed by `"{bucket}_{weekday}"`
    pub time_day: HashMap<String, u32>,

    /// Counts keyed by `"{mood}_{weekday}"`
    pub mood_day: HashMap<String, u32>,

    /// Top-3 most frequent interaction hours, most frequent first
    pub peak_hours: Vec<u32>,
}

/// Derived behavior patterns for one user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorPatterns {
    /// Per time-bucket counts of interaction kinds
    pub time_preferences: HashMap<String, HashMap<String, u32>>,

    /// Per-kind content statistics
    pub content_preferences: HashMap<String, ContentStats>,

    /// Per normalized-mood counts of interaction kinds
    pub mood_preferences: HashMap<String, HashMap<String, u32>>,

    /// Session/engagement statistics
    pub engagement: EngagementPatterns,

    /// Joint (time x day) and (mood x day) distributions plus peak hours
    pub contextual: ContextualPatterns,
}

/// Derives behavior patterns from recorded events and preference records
pub struct PatternLearner {
    session_gap: Duration,
}

impl PatternLearner {
    /// Create a learner using the given session inactivity gap in minutes
    pub fn new(session_gap_minutes: i64) -> Self {
        Self {
            session_gap: Duration::minutes(session_gap_minutes),
        }
    }

    /// Run the full pattern pass.
    ///
    /// Sub-analyses degrade independently: a failure in one slice logs a
    /// warning and leaves that slice empty.
    pub fn derive(
        &self,
        events: &[InteractionEvent],
        preferences: &PreferenceAggregator,
    ) -> BehaviorPatterns {
        BehaviorPatterns {
            time_preferences: contain("time", self.analyze_time_preferences(events)),
            content_preferences: contain("content", self.analyze_content_preferences(preferences)),
            mood_preferences: contain("mood", self.analyze_mood_preferences(events)),
            engagement: contain("engagement", self.analyze_engagement(events)),
            contextual: contain("contextual", self.analyze_contextual(events)),
        }
    }

    /// Counts of each interaction kind bucketed by time of day
    pub fn analyze_time_preferences(
        &self,
        events: &[InteractionEvent],
    ) -> Result<HashMap<String, HashMap<String, u32>>> {
        let mut prefs: HashMap<String, HashMap<String, u32>> = HashMap::new();
        for event in events {
            *prefs
                .entry(event.context.time_of_day.as_str().to_string())
                .or_default()
                .entry(event.kind.clone())
                .or_insert(0) += 1;
        }
        Ok(prefs)
    }

    /// Per-kind frequency, effectiveness, rating, and completion rate
    pub fn analyze_content_preferences(
        &self,
        preferences: &PreferenceAggregator,
    ) -> Result<HashMap<String, ContentStats>> {
        let stats = preferences
            .records()
            .iter()
            .map(|(kind, record)| {
                (
                    kind.clone(),
                    ContentStats {
                        frequency: record.frequency,
                        effectiveness: record.effectiveness,
                        user_rating: record.user_rating,
                        completion_rate: record.completion_rate(),
                    },
                )
            })
            .collect();
        Ok(stats)
    }

    /// Per normalized-mood counts of interaction kinds.
    ///
    /// Events without a mood reading are skipped — absence of mood is not
    /// evidence of "neutral".
    pub fn analyze_mood_preferences(
        &self,
        events: &[InteractionEvent],
    ) -> Result<HashMap<String, HashMap<String, u32>>> {
        let mut prefs: HashMap<String, HashMap<String, u32>> = HashMap::new();
        for event in events {
            if let Some(mood) = &event.context.mood {
                *prefs
                    .entry(mood.category().to_string())
                    .or_default()
                    .entry(event.kind.clone())
                    .or_insert(0) += 1;
            }
        }
        Ok(prefs)
    }

    /// Session grouping and per-kind engagement scores
    pub fn analyze_engagement(&self, events: &[InteractionEvent]) -> Result<EngagementPatterns> {
        if events.is_empty() {
            return Ok(EngagementPatterns::default());
        }

        let mut ordered: Vec<&InteractionEvent> = events.iter().collect();
        ordered.sort_by_key(|e| e.timestamp);

        // Group into sessions by the inactivity gap
        let mut session_lengths: Vec<f32> = Vec::new();
        let mut session_start = ordered[0].timestamp;
        let mut session_end = ordered[0].timestamp;
        for event in ordered.iter().skip(1) {
            if event.timestamp.signed_duration_since(session_end) > self.session_gap {
                session_lengths.push(minutes_between(session_start, session_end));
                session_start = event.timestamp;
            }
            session_end = event.timestamp;
        }
        session_lengths.push(minutes_between(session_start, session_end));

        let session_count = session_lengths.len() as u32;
        let avg_session_minutes =
            session_lengths.iter().sum::<f32>() / session_lengths.len() as f32;

        // Per-kind completion and rating aggregates
        let mut per_kind: HashMap<String, (u32, u32, u32, u32)> = HashMap::new(); // (uses, completed, rating_sum, rating_count)
        for event in &ordered {
            let entry = per_kind.entry(event.kind.clone()).or_default();
            entry.0 += 1;
            if crate::learning::preferences::payload_completed(&event.payload) == Some(true) {
                entry.1 += 1;
            }
            if let Some(r) = event.user_rating {
                entry.2 += r as u32;
                entry.3 += 1;
            }
        }

        let engagement_scores = per_kind
            .into_iter()
            .map(|(kind, (uses, completed, rating_sum, rating_count))| {
                let completion_rate = completed as f32 / uses as f32;
                let avg_rating = if rating_count > 0 {
                    rating_sum as f32 / rating_count as f32 / 5.0
                } else {
                    0.0
                };
                (kind, 0.7 * completion_rate + 0.3 * avg_rating)
            })
            .collect();

        Ok(EngagementPatterns {
            session_count,
            avg_session_minutes,
            engagement_scores,
        })
    }

    /// Joint (time x day) and (mood x day) distributions plus peak hours
    pub fn analyze_contextual(&self, events: &[InteractionEvent]) -> Result<ContextualPatterns> {
        let mut time_day: HashMap<String, u32> = HashMap::new();
        let mut mood_day: HashMap<String, u32> = HashMap::new();
        let mut hour_counts: HashMap<u32, u32> = HashMap::new();

        for event in events {
            *time_day.entry(event.context.count_key()).or_insert(0) += 1;
            if let Some(mood) = &event.context.mood {
                let key = format!(
                    "{}_{}",
                    mood.category(),
                    weekday_str(event.context.day_of_week)
                );
                *mood_day.entry(key).or_insert(0) += 1;
            }
            *hour_counts.entry(event.context.hour).or_insert(0) += 1;
        }

        // Top-3 hours; ties break toward the earlier hour for determinism
        let mut hours: Vec<(u32, u32)> = hour_counts.into_iter().collect();
        hours.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let peak_hours = hours.into_iter().take(3).map(|(h, _)| h).collect();

        Ok(ContextualPatterns {
            time_day,
            mood_day,
            peak_hours,
        })
    }
}

/// Contained-failure boundary for one pattern slice
fn contain<T: Default>(slice: &str, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        warn!("Pattern analysis slice '{}' failed, degrading to empty: {}", slice, e);
        T::default()
    })
}

fn minutes_between(start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>) -> f32 {
    end.signed_duration_since(start).num_seconds() as f32 / 60.0
}
