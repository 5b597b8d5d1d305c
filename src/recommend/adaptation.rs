//! Real-time recommendation adaptation.
//!
//! Applies context-sensitive adjustments to a base recommendation bundle:
//! cached per-context overlays, mood-based boosts, time-of-day boosts, and
//! the stress/anxiety override. Maintains the context-keyed adaptation cache
//! (24h TTL, read-merge-write per key).
//!
//! The whole stage is a pure transform of its inputs plus the cache — no
//! network calls in the hot path. The crisis override in particular is a
//! local rule with no external dependency: it must keep working when every
//! collaborator is down.

use crate::types::{
    clamp01, AdaptationCacheEntry, AdaptedBundle, AlertLevel, ContextSnapshot, Priority,
    Recommendation, RecommendationCategory, RecommendationsBundle, SourceTag, TimeOfDay,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Mood category -> content kinds to steer toward when that mood is read
/// with high confidence
pub const MOOD_PRIORITIES: &[(&str, &[&str])] = &[
    ("anxious", &["breathing_exercise", "meditation", "mindfulness"]),
    ("sad", &["journaling", "gratitude_practice", "social_activity"]),
    ("stressed", &["breathing_exercise", "calming_music", "meditation"]),
];

/// Time bucket -> content kinds that fit that part of the day
pub const TIME_PRIORITIES: &[(TimeOfDay, &[&str])] = &[
    (TimeOfDay::Morning, &["meditation", "movement_break", "mindfulness"]),
    (TimeOfDay::Afternoon, &["breathing_exercise", "movement_break", "nature_sounds"]),
    (TimeOfDay::Evening, &["journaling", "gratitude_practice", "calming_music"]),
    (TimeOfDay::Night, &["sleep_story", "calming_music", "breathing_exercise"]),
];

/// Kinds that receive the late-night calming boost
pub const CALMING_KINDS: &[&str] = &[
    "sleep_story",
    "calming_music",
    "nature_sounds",
    "meditation",
    "breathing_exercise",
];

/// Kinds boosted under elevated (but not critical) distress
pub const STRESS_RELIEF_KINDS: &[&str] = &[
    "breathing_exercise",
    "meditation",
    "mindfulness",
    "calming_music",
];

/// The only kinds returned under a critical distress override
pub const CRISIS_ALLOWLIST: &[&str] = &[
    "breathing_exercise",
    "grounding_exercise",
    "crisis_support",
    "emergency_contact",
];

const MOOD_BOOST: f32 = 0.2;
const TIME_BOOST: f32 = 0.1;
const LATE_NIGHT_BOOST: f32 = 0.15;
const ELEVATED_BOOST: f32 = 0.25;

/// Distress level that marks the bundle critical
const CRITICAL_LEVEL: u8 = 8;

/// Distress level that marks the bundle elevated
const ELEVATED_LEVEL: u8 = 6;

/// How many adapted recommendations are written back to the cache entry
const CACHE_ENTRY_LIMIT: usize = 5;

/// Real-time adaptation engine with the context-keyed cache
#[derive(Default)]
pub struct AdaptationEngine {
    cache: HashMap<String, AdaptationCacheEntry>,
}

impl AdaptationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load previously persisted entries (expired ones are dropped on entry)
    pub fn load_entries(&mut self, entries: Vec<AdaptationCacheEntry>, now: DateTime<Utc>) {
        for entry in entries {
            if !entry.is_expired(now) {
                self.cache.insert(entry.signature.clone(), entry);
            }
        }
    }

    /// Live entry for a signature; expired entries are never returned
    pub fn lookup(&self, signature: &str, now: DateTime<Utc>) -> Option<&AdaptationCacheEntry> {
        self.cache.get(signature).filter(|e| !e.is_expired(now))
    }

    /// Remove expired entries; returns how many were purged
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.cache.len();
        self.cache.retain(|_, entry| !entry.is_expired(now));
        before - self.cache.len()
    }

    /// Number of entries currently cached (including any not yet purged)
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Adapt a base bundle to the current context.
    ///
    /// Returns the adapted bundle and the refreshed cache entry for this
    /// context signature; the caller persists the entry best-effort.
    pub fn adapt(
        &mut self,
        base: &RecommendationsBundle,
        context: &ContextSnapshot,
        interaction_count: u64,
        now: DateTime<Utc>,
    ) -> (AdaptedBundle, AdaptationCacheEntry) {
        let signature = context.signature();

        // Working set: activities + content as one adaptable list
        let mut recommendations: Vec<Recommendation> = base
            .activities
            .iter()
            .chain(base.content.iter())
            .cloned()
            .collect();
        let mut confidence = clamp01(base.confidence);

        // Step 2: overlay the cached observations for this context
        if let Some(entry) = self.lookup(&signature, now) {
            debug!(
                "Applying cached adaptation for {} (score {:.2})",
                signature, entry.adaptation_score
            );
            for cached in &entry.recommendations {
                match recommendations
                    .iter_mut()
                    .find(|r| r.kind == cached.kind && r.category == cached.category)
                {
                    Some(existing) => {
                        if cached.score > existing.score {
                            *existing = cached.clone();
                        }
                    }
                    None => recommendations.push(cached.clone()),
                }
            }
            confidence = clamp01((confidence + entry.adaptation_score) / 2.0);
        }

        // Step 3: mood-based boosts
        if let Some(mood) = &context.mood {
            if mood.confidence > 0.7 {
                if let Some(priority_kinds) = mood_priorities(mood.category()) {
                    for rec in &mut recommendations {
                        if priority_kinds.contains(&rec.kind.as_str()) {
                            rec.boost(MOOD_BOOST);
                        }
                    }
                }
            }
        }

        // Step 4: time-based prioritization
        if let Some(time_kinds) = time_priorities(context.time_of_day) {
            for rec in &mut recommendations {
                if time_kinds.contains(&rec.kind.as_str()) {
                    rec.boost(TIME_BOOST);
                }
            }
        }
        if context.hour >= 22 || context.hour < 6 {
            for rec in &mut recommendations {
                if CALMING_KINDS.contains(&rec.kind.as_str()) {
                    rec.boost(LATE_NIGHT_BOOST);
                }
            }
        }

        // Step 5: stress/anxiety override
        let alert_level = match context.distress_level() {
            Some(level) if level >= CRITICAL_LEVEL => {
                recommendations.retain(|r| CRISIS_ALLOWLIST.contains(&r.kind.as_str()));
                for rec in &mut recommendations {
                    rec.priority = Priority::Urgent;
                }
                // Crisis content must surface even from an empty base; this
                // is a pure local rule with no external dependency.
                for kind in CRISIS_ALLOWLIST {
                    if !recommendations.iter().any(|r| r.kind == *kind) {
                        recommendations.push(Recommendation {
                            category: RecommendationCategory::Content,
                            kind: kind.to_string(),
                            score: 0.95,
                            reason: "Immediate relief for right now".to_string(),
                            priority: Priority::Urgent,
                            source: SourceTag::Rule,
                        });
                    }
                }
                AlertLevel::Critical
            }
            Some(level) if level >= ELEVATED_LEVEL => {
                for rec in &mut recommendations {
                    if STRESS_RELIEF_KINDS.contains(&rec.kind.as_str()) {
                        rec.boost(ELEVATED_BOOST);
                        rec.priority = Priority::High;
                    }
                }
                AlertLevel::Elevated
            }
            _ => AlertLevel::Normal,
        };

        // Step 6: bundle confidence
        match &context.mood {
            Some(mood) if mood.confidence > 0.8 => confidence += 0.1,
            Some(mood) if mood.confidence < 0.3 => confidence -= 0.1,
            Some(_) => {}
            None => confidence -= 0.1,
        }
        if interaction_count > 50 {
            confidence += 0.1;
        }
        let confidence = clamp01(confidence);

        recommendations.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.kind.cmp(&b.kind))
        });

        // Step 7: read-merge-write the cache entry with a fresh TTL
        let observation = AdaptationCacheEntry::new(
            signature.clone(),
            confidence,
            recommendations.iter().take(CACHE_ENTRY_LIMIT).cloned().collect(),
            now,
        );
        let entry = match self.cache.get_mut(&signature) {
            Some(existing) => {
                existing.merge(&observation, now);
                existing.clone()
            }
            None => {
                self.cache.insert(signature.clone(), observation.clone());
                observation
            }
        };

        let bundle = AdaptedBundle {
            recommendations,
            confidence,
            alert_level,
            signature,
            adapted_at: now,
        };
        (bundle, entry)
    }
}

fn mood_priorities(category: &str) -> Option<&'static [&'static str]> {
    MOOD_PRIORITIES
        .iter()
        .find(|(mood, _)| *mood == category)
        .map(|(_, kinds)| *kinds)
}

fn time_priorities(bucket: TimeOfDay) -> Option<&'static [&'static str]> {
    TIME_PRIORITIES
        .iter()
        .find(|(b, _)| *b == bucket)
        .map(|(_, kinds)| *kinds)
}
