//! Property-based tests for scoring and cache invariants
//!
//! Covers the engine's hard guarantees: score bounds, context signature
//! determinism, and cache merge idempotence, across generated inputs.

use attune::types::{
    context_signature, AdaptationCacheEntry, ContextSnapshot, MoodReading, Recommendation,
    RecommendationCategory, TimeOfDay,
};
use chrono::{TimeZone, Utc, Weekday};
use proptest::prelude::*;

fn weekday(index: u8) -> Weekday {
    match index % 7 {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

fn arb_mood() -> impl Strategy<Value = Option<(String, f32)>> {
    proptest::option::of((
        prop_oneof![
            Just("joy".to_string()),
            Just("anxiety".to_string()),
            Just("down".to_string()),
            Just("overwhelmed".to_string()),
            Just("peaceful".to_string()),
            Just("confused".to_string()),
        ],
        0.0f32..=1.0,
    ))
}

fn snapshot(hour: u32, day: Weekday, mood: Option<(String, f32)>, minute: u32) -> ContextSnapshot {
    ContextSnapshot {
        time_of_day: TimeOfDay::from_hour(hour),
        day_of_week: day,
        hour,
        mood: mood.map(|(emotion, confidence)| MoodReading { emotion, confidence }),
        stress_level: None,
        anxiety_level: None,
        timestamp: Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap(),
    }
}

proptest! {
    // Signature depends only on (bucket, weekday, mood category), never on
    // the exact timestamp or mood confidence
    #[test]
    fn signature_deterministic(
        hour in 0u32..24,
        day_index in 0u8..7,
        mood in arb_mood(),
        minute_a in 0u32..60,
        minute_b in 0u32..60,
        confidence_b in 0.0f32..=1.0,
    ) {
        let day = weekday(day_index);
        let a = snapshot(hour, day, mood.clone(), minute_a);
        let b = snapshot(
            hour,
            day,
            mood.map(|(emotion, _)| (emotion, confidence_b)),
            minute_b,
        );

        prop_assert_eq!(a.signature(), b.signature());
    }

    // The free function and the snapshot method agree
    #[test]
    fn signature_pure_function(hour in 0u32..24, day_index in 0u8..7, mood in arb_mood()) {
        let day = weekday(day_index);
        let snap = snapshot(hour, day, mood, 0);
        let expected = context_signature(
            snap.time_of_day,
            snap.day_of_week,
            snap.mood.as_ref().map(|m| m.category()),
        );
        prop_assert_eq!(snap.signature(), expected);
    }

    // Merging an entry into itself any number of times changes nothing
    #[test]
    fn cache_merge_idempotent(
        score in 0.0f32..=1.0,
        kinds in proptest::collection::vec("[a-z_]{3,18}", 0..6),
        scores in proptest::collection::vec(0.0f32..=1.0, 6),
    ) {
        let now = Utc::now();
        let recommendations: Vec<Recommendation> = kinds
            .iter()
            .zip(scores.iter())
            .map(|(kind, s)| {
                Recommendation::rule(RecommendationCategory::Content, kind.clone(), *s, "r")
            })
            .collect();

        let mut entry = AdaptationCacheEntry::new("morning:mon:none".into(), score, recommendations, now);
        let original = entry.clone();

        entry.merge(&original, now);
        entry.merge(&original, now);

        prop_assert_eq!(entry.recommendations.len(), original.recommendations.len());
        prop_assert!((entry.adaptation_score - original.adaptation_score).abs() < 1e-6);
    }

    // Rule-constructed recommendations and boosts always stay in [0, 1]
    #[test]
    fn scores_always_bounded(
        score in -5.0f32..5.0,
        boost in -2.0f32..2.0,
    ) {
        let mut rec = Recommendation::rule(RecommendationCategory::Activity, "walk", score, "r");
        prop_assert!((0.0..=1.0).contains(&rec.score));
        rec.boost(boost);
        prop_assert!((0.0..=1.0).contains(&rec.score));
    }

    // Expired entries are never considered live, whatever the offsets
    #[test]
    fn expiry_strict(hours_offset in -48i64..48) {
        let now = Utc::now();
        let entry = AdaptationCacheEntry::new("night:sun:none".into(), 0.5, vec![], now);
        let probe = now + chrono::Duration::hours(hours_offset);

        prop_assert_eq!(entry.is_expired(probe), entry.expires_at < probe);
    }
}
