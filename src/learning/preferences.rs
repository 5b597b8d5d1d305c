//! Rolling per-kind preference statistics.
//!
//! The aggregator maintains one [`PreferenceRecord`] per interaction kind and
//! updates it synchronously on every recorded event. Counters only grow;
//! effectiveness is a recency-weighted average in [0, 1].

use crate::types::{clamp01, ContextSnapshot, Payload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Rolling statistics for one interaction kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceRecord {
    /// How many times this kind was used (monotonically non-decreasing)
    pub frequency: u32,

    /// Timestamp of the most recent use
    pub last_used_at: DateTime<Utc>,

    /// Usage counts per context key (see [`ContextSnapshot::count_key`])
    pub context_counts: HashMap<String, u32>,

    /// Rolling effectiveness average (0.0 - 1.0)
    pub effectiveness: f32,

    /// Most recent explicit rating (1-5; 0.0 until first rating)
    pub user_rating: f32,

    /// How many uses carried `completed = true`
    pub completed_count: u32,
}

impl PreferenceRecord {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            frequency: 0,
            last_used_at: now,
            context_counts: HashMap::new(),
            effectiveness: 0.0,
            user_rating: 0.0,
            completed_count: 0,
        }
    }

    /// Completion rate over all uses of this kind
    pub fn completion_rate(&self) -> f32 {
        if self.frequency == 0 {
            0.0
        } else {
            self.completed_count as f32 / self.frequency as f32
        }
    }
}

/// Extract the `completed` flag from an event payload
pub fn payload_completed(payload: &Payload) -> Option<bool> {
    payload.get("completed").and_then(|v| v.as_bool())
}

/// Extract a 1-5 `rating` from an event payload
pub fn payload_rating(payload: &Payload) -> Option<u8> {
    payload
        .get("rating")
        .and_then(|v| v.as_u64())
        .filter(|r| (1..=5).contains(r))
        .map(|r| r as u8)
}

/// Maintains rolling preference statistics across all interaction kinds
#[derive(Debug, Default)]
pub struct PreferenceAggregator {
    records: HashMap<String, PreferenceRecord>,
}

impl PreferenceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update statistics for one recorded interaction.
    ///
    /// Effectiveness uses the recency-weighted average
    /// `effectiveness = (effectiveness + observed) / 2` where `observed` is
    /// the normalized rating when present, otherwise 1.0/0.0 from the
    /// completed flag. This heavily weights the latest observation and is
    /// reproduced as specified (not a true moving average).
    pub fn update(&mut self, kind: &str, payload: &Payload, context: &ContextSnapshot) {
        let record = self
            .records
            .entry(kind.to_string())
            .or_insert_with(|| PreferenceRecord::new(context.timestamp));

        record.frequency += 1;
        record.last_used_at = context.timestamp;
        *record.context_counts.entry(context.count_key()).or_insert(0) += 1;

        let completed = payload_completed(payload);
        let rating = payload_rating(payload);

        if completed == Some(true) {
            record.completed_count += 1;
        }

        if completed.is_some() || rating.is_some() {
            let observed = match rating {
                Some(r) => clamp01(r as f32 / 5.0),
                None => {
                    if completed == Some(true) {
                        1.0
                    } else {
                        0.0
                    }
                }
            };
            record.effectiveness = clamp01((record.effectiveness + observed) / 2.0);
        }

        if let Some(r) = rating {
            record.user_rating = r as f32;
        }

        debug!(
            "Updated preferences for {}: freq={}, effectiveness={:.2}",
            kind, record.frequency, record.effectiveness
        );
    }

    /// Preference record for one kind
    pub fn get(&self, kind: &str) -> Option<&PreferenceRecord> {
        self.records.get(kind)
    }

    /// All preference records, keyed by interaction kind
    pub fn records(&self) -> &HashMap<String, PreferenceRecord> {
        &self.records
    }

    /// Number of distinct kinds seen
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records (used when reloading state from the durable store)
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MoodReading, TimeOfDay};
    use chrono::{TimeZone, Weekday};

    fn ctx() -> ContextSnapshot {
        ContextSnapshot {
            time_of_day: TimeOfDay::Morning,
            day_of_week: Weekday::Mon,
            hour: 9,
            mood: Some(MoodReading {
                emotion: "calm".into(),
                confidence: 0.8,
            }),
            stress_level: None,
            anxiety_level: None,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
        }
    }

    fn payload(completed: Option<bool>, rating: Option<u64>) -> Payload {
        let mut p = Payload::new();
        if let Some(c) = completed {
            p.insert("completed".into(), serde_json::Value::Bool(c));
        }
        if let Some(r) = rating {
            p.insert("rating".into(), serde_json::json!(r));
        }
        p
    }

    #[test]
    fn test_frequency_and_context_counts() {
        let mut agg = PreferenceAggregator::new();
        for _ in 0..3 {
            agg.update("breathing_exercise", &Payload::new(), &ctx());
        }

        let record = agg.get("breathing_exercise").unwrap();
        assert_eq!(record.frequency, 3);
        assert_eq!(record.context_counts["morning_mon"], 3);
        assert_eq!(record.completed_count, 0);
    }

    #[test]
    fn test_effectiveness_recency_weighted_average() {
        let mut agg = PreferenceAggregator::new();

        // completed=true with no rating: observed = 1.0
        agg.update("meditation", &payload(Some(true), None), &ctx());
        assert!((agg.get("meditation").unwrap().effectiveness - 0.5).abs() < 1e-6);

        // again: (0.5 + 1.0) / 2 = 0.75
        agg.update("meditation", &payload(Some(true), None), &ctx());
        assert!((agg.get("meditation").unwrap().effectiveness - 0.75).abs() < 1e-6);

        // not completed: (0.75 + 0.0) / 2 = 0.375
        agg.update("meditation", &payload(Some(false), None), &ctx());
        assert!((agg.get("meditation").unwrap().effectiveness - 0.375).abs() < 1e-6);
    }

    #[test]
    fn test_rating_takes_precedence_over_completed() {
        let mut agg = PreferenceAggregator::new();

        // rating=5 -> observed = 1.0 even though completed=false
        agg.update("journal_entry", &payload(Some(false), Some(5)), &ctx());
        let record = agg.get("journal_entry").unwrap();
        assert!((record.effectiveness - 0.5).abs() < 1e-6);
        assert!((record.user_rating - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_neutral_payload_leaves_effectiveness_untouched() {
        let mut agg = PreferenceAggregator::new();
        agg.update("walk", &payload(Some(true), None), &ctx());
        let before = agg.get("walk").unwrap().effectiveness;

        // No completed/rating signal: frequency moves, effectiveness does not
        agg.update("walk", &Payload::new(), &ctx());
        let record = agg.get("walk").unwrap();
        assert_eq!(record.frequency, 2);
        assert!((record.effectiveness - before).abs() < 1e-6);
    }

    #[test]
    fn test_completion_rate() {
        let mut agg = PreferenceAggregator::new();
        agg.update("walk", &payload(Some(true), None), &ctx());
        agg.update("walk", &payload(Some(false), None), &ctx());
        agg.update("walk", &Payload::new(), &ctx());

        let record = agg.get("walk").unwrap();
        assert_eq!(record.completed_count, 1);
        assert!((record.completion_rate() - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_rating_ignored() {
        let mut agg = PreferenceAggregator::new();
        agg.update("walk", &payload(None, Some(9)), &ctx());

        let record = agg.get("walk").unwrap();
        assert!((record.user_rating - 0.0).abs() < f32::EPSILON);
        assert!((record.effectiveness - 0.0).abs() < f32::EPSILON);
    }
}
