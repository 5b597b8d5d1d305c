//! Core data types for the Attune behavior engine
//!
//! This module defines the fundamental data structures used throughout the
//! engine: interaction events, context snapshots, recommendations, behavior
//! profiles, and the adaptation cache. These types form the foundation of the
//! adaptive behavior-learning pipeline.

use chrono::{DateTime, Duration, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Semantic key/value payload attached to an interaction event
pub type Payload = HashMap<String, serde_json::Value>;

/// Unique identifier for interaction events
///
/// Wraps a UUID to provide type safety and prevent mixing event IDs with
/// other UUID-based identifiers in the system. Also the dedup key when local
/// and durable event sets are merged on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new random event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an event ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time-of-day bucket derived from the local hour
///
/// Bucketing: [6,12) → Morning, [12,17) → Afternoon, [17,21) → Evening,
/// everything else → Night. `Unknown` is the degraded value used when clock
/// resolution fails; it must never abort context resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
    Unknown,
}

impl TimeOfDay {
    /// Derive the bucket from an hour in [0, 24)
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            h if h < 24 => TimeOfDay::Night,
            _ => TimeOfDay::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
            TimeOfDay::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Most recent mood reading attached to a context snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodReading {
    /// Raw emotion label as reported by the mood tracker (e.g. "joy")
    pub emotion: String,

    /// Classifier confidence (0.0 - 1.0)
    pub confidence: f32,
}

impl MoodReading {
    /// Normalized mood category for this reading (see [`normalize_mood`])
    pub fn category(&self) -> &'static str {
        normalize_mood(&self.emotion)
    }
}

/// Normalize a free-form emotion label into a fixed mood category
///
/// Mood strings arrive from several app surfaces with inconsistent
/// vocabulary; all downstream aggregation keys on the categories returned
/// here. Unmapped labels collapse to "neutral".
pub fn normalize_mood(emotion: &str) -> &'static str {
    match emotion.to_lowercase().as_str() {
        "happy" | "joy" | "happiness" | "excited" | "content" => "happy",
        "anxious" | "anxiety" | "worried" | "nervous" | "panicked" => "anxious",
        "sad" | "sadness" | "down" | "depressed" | "lonely" => "sad",
        "stressed" | "stress" | "overwhelmed" | "frustrated" => "stressed",
        "calm" | "peaceful" | "relaxed" | "serene" => "calm",
        _ => "neutral",
    }
}

/// Snapshot of "now": time bucket, day, and the latest mood/stress readings
///
/// Produced by the context resolver and embedded immutably in every
/// interaction event. Missing mood is represented as `None`, never a
/// fabricated default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Time-of-day bucket
    pub time_of_day: TimeOfDay,

    /// Day of week
    pub day_of_week: Weekday,

    /// Hour of day in [0, 24)
    pub hour: u32,

    /// Most recent mood reading, if one is fresh enough
    pub mood: Option<MoodReading>,

    /// Self-reported stress level (0-10)
    pub stress_level: Option<u8>,

    /// Self-reported anxiety level (0-10)
    pub anxiety_level: Option<u8>,

    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

impl ContextSnapshot {
    /// Key for per-context preference counters: `"{bucket}_{weekday}"`.
    ///
    /// Pure function of the time bucket and weekday; the single place this
    /// key format is constructed.
    pub fn count_key(&self) -> String {
        format!("{}_{}", self.time_of_day, weekday_str(self.day_of_week))
    }

    /// Deterministic adaptation-cache signature for this snapshot.
    ///
    /// Pure function of `(time_of_day, day_of_week, mood category)` only —
    /// two snapshots taken at different instants map to the same signature
    /// whenever those three inputs match.
    pub fn signature(&self) -> String {
        context_signature(
            self.time_of_day,
            self.day_of_week,
            self.mood.as_ref().map(|m| m.category()),
        )
    }

    /// Effective distress level: `max(anxiety, stress)`, if either is known
    pub fn distress_level(&self) -> Option<u8> {
        match (self.anxiety_level, self.stress_level) {
            (Some(a), Some(s)) => Some(a.max(s)),
            (Some(a), None) => Some(a),
            (None, Some(s)) => Some(s),
            (None, None) => None,
        }
    }
}

/// Lowercase weekday label used in context keys
pub fn weekday_str(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

/// Build an adaptation-cache signature from its three determining inputs
///
/// `"{bucket}:{weekday}:{mood-or-none}"`. Exposed separately from
/// [`ContextSnapshot::signature`] so cache maintenance can construct keys
/// without a full snapshot.
pub fn context_signature(
    time_of_day: TimeOfDay,
    day_of_week: Weekday,
    mood_category: Option<&str>,
) -> String {
    format!(
        "{}:{}:{}",
        time_of_day,
        weekday_str(day_of_week),
        mood_category.unwrap_or("none")
    )
}

/// A single recorded user interaction
///
/// Immutable once created. Events are retained in a bounded recent window
/// locally; the durable copy is append-only and owned by the persistence
/// gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Unique identifier (dedup key for local/durable merge)
    pub id: EventId,

    /// Interaction kind (e.g. "breathing_exercise", "journal_entry")
    pub kind: String,

    /// Semantic payload; well-known keys are "completed" and "rating"
    pub payload: Payload,

    /// When the interaction happened
    pub timestamp: DateTime<Utc>,

    /// Context at the moment of interaction
    pub context: ContextSnapshot,

    /// Session this event belongs to (30-minute inactivity gap rule)
    pub session_id: String,

    /// Observed effectiveness (0.0 - 1.0), if derivable from the payload
    pub effectiveness_score: Option<f32>,

    /// Explicit user rating (1-5), if present in the payload
    pub user_rating: Option<u8>,
}

/// Options for recording an interaction
///
/// All fields default to "let the engine decide"; tests and backfill paths
/// pin them explicitly.
#[derive(Debug, Default, Clone)]
pub struct TrackOptions {
    /// Override the event timestamp (default: now)
    pub timestamp: Option<DateTime<Utc>>,

    /// Override the resolved context snapshot
    pub context: Option<ContextSnapshot>,

    /// Force a specific session id (skips the gap heuristic)
    pub session_id: Option<String>,
}

/// Recommendation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationCategory {
    Activity,
    Content,
    Peer,
}

/// Recommendation priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Where a recommendation came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    /// Produced by the external suggestion provider
    Ai,

    /// Produced by local rule-based scoring
    Rule,
}

/// A single scored recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    /// Category (activity, content, peer)
    pub category: RecommendationCategory,

    /// Recommended interaction/content kind
    pub kind: String,

    /// Relevance score (0.0 - 1.0)
    pub score: f32,

    /// Human-readable explanation of why this was recommended
    pub reason: String,

    /// Priority
    pub priority: Priority,

    /// Source of the recommendation
    pub source: SourceTag,
}

impl Recommendation {
    /// Rule-based recommendation with score clamped to [0, 1]
    pub fn rule(category: RecommendationCategory, kind: impl Into<String>, score: f32, reason: impl Into<String>) -> Self {
        Self {
            category,
            kind: kind.into(),
            score: clamp01(score),
            reason: reason.into(),
            priority: Priority::Medium,
            source: SourceTag::Rule,
        }
    }

    /// Apply a score boost, keeping the score in bounds
    pub fn boost(&mut self, delta: f32) {
        self.score = clamp01(self.score + delta);
    }
}

/// Bundle-level alert state set by the real-time adaptation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// No distress signals
    Normal,

    /// Distress level in [6, 8): stress-relief content boosted
    Elevated,

    /// Distress level >= 8: only crisis-relief content is returned
    Critical,
}

/// Full recommendation set produced by the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationsBundle {
    /// Top-ranked activity suggestions
    pub activities: Vec<Recommendation>,

    /// Merged content recommendations
    pub content: Vec<Recommendation>,

    /// Peer connection matches
    pub peers: Vec<PeerMatch>,

    /// Bundle-level confidence (0.0 - 1.0)
    pub confidence: f32,

    /// When the bundle was generated
    pub generated_at: DateTime<Utc>,
}

/// Recommendation bundle after real-time adaptation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptedBundle {
    /// Adapted recommendation list (activities + content merged view)
    pub recommendations: Vec<Recommendation>,

    /// Recomputed confidence (0.0 - 1.0)
    pub confidence: f32,

    /// Alert state from the stress/anxiety override
    pub alert_level: AlertLevel,

    /// Context signature the adaptation was keyed on
    pub signature: String,

    /// When the adaptation ran
    pub adapted_at: DateTime<Utc>,
}

/// Peer connection tier derived from the compatibility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerConnection {
    /// Compatibility > 0.7
    SupportPartner,

    /// Compatibility in [0.5, 0.7]
    MentorConnection,
}

/// A matched peer with compatibility score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMatch {
    /// Candidate peer id
    pub peer_id: String,

    /// Compatibility score (0.0 - 1.0)
    pub score: f32,

    /// Suggested connection tier
    pub connection: PeerConnection,

    /// Source of the match
    pub source: SourceTag,
}

/// Tunable adaptation parameters stored on the behavior profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationSettings {
    /// How quickly preferences shift toward new observations
    pub learning_rate: f32,

    /// Minimum pattern confidence before adaptation applies it
    pub adaptation_threshold: f32,

    /// How strongly context (time/mood) modulates scoring
    pub context_sensitivity: f32,
}

impl Default for AdaptationSettings {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            adaptation_threshold: 0.3,
            context_sensitivity: 0.7,
        }
    }
}

/// Learned behavior profile for a single user
///
/// Created lazily on first learning pass, upserted every 10 interactions.
/// The durable copy is the source of truth across app restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorProfile {
    /// Owning user
    pub user_id: String,

    /// Derived patterns (time, content, mood, engagement, contextual)
    pub patterns: crate::learning::patterns::BehaviorPatterns,

    /// Tunable adaptation parameters
    pub adaptation: AdaptationSettings,

    /// Total interactions observed when this profile was built
    pub interaction_count: u64,

    /// Last profile update
    pub updated_at: DateTime<Utc>,
}

/// Context-keyed adaptation cache entry
///
/// Keyed by [`context_signature`]. TTL is 24 hours; entries past `expires_at`
/// must never be returned by a lookup and are purged by the cleanup sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationCacheEntry {
    /// Deterministic context signature (the cache key)
    pub signature: String,

    /// Learned adaptation strength for this context (0.0 - 1.0)
    pub adaptation_score: f32,

    /// Recommendations observed to work in this context
    pub recommendations: Vec<Recommendation>,

    /// When the entry was first created
    pub created_at: DateTime<Utc>,

    /// Hard expiry; refreshed to now + TTL on every upsert
    pub expires_at: DateTime<Utc>,
}

impl AdaptationCacheEntry {
    /// Default time-to-live for cache entries
    pub const TTL_HOURS: i64 = 24;

    /// Create a fresh entry with the standard TTL
    pub fn new(
        signature: String,
        adaptation_score: f32,
        recommendations: Vec<Recommendation>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            signature,
            adaptation_score: clamp01(adaptation_score),
            recommendations,
            created_at: now,
            expires_at: now + Duration::hours(Self::TTL_HOURS),
        }
    }

    /// Whether the entry is past its expiry at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Merge a repeated observation for the same signature into this entry.
    ///
    /// The adaptation score becomes the average of the two; recommendation
    /// lists merge by kind with the higher-scoring entry winning conflicts.
    /// Merging an entry into itself is idempotent: no duplicates, same score.
    pub fn merge(&mut self, other: &AdaptationCacheEntry, now: DateTime<Utc>) {
        debug_assert_eq!(self.signature, other.signature);

        if (self.adaptation_score - other.adaptation_score).abs() > f32::EPSILON {
            self.adaptation_score = clamp01((self.adaptation_score + other.adaptation_score) / 2.0);
        }

        for incoming in &other.recommendations {
            match self
                .recommendations
                .iter_mut()
                .find(|r| r.kind == incoming.kind && r.category == incoming.category)
            {
                Some(existing) => {
                    if incoming.score > existing.score {
                        *existing = incoming.clone();
                    }
                }
                None => self.recommendations.push(incoming.clone()),
            }
        }

        self.expires_at = now + Duration::hours(Self::TTL_HOURS);
    }
}

/// Minimal durable user profile owned by the persistence gateway
///
/// Created idempotently by `ensure_user_profile`. The trait fields feed peer
/// compatibility scoring; a fresh profile has them all empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    /// Owning user
    pub user_id: String,

    /// Declared interests (e.g. "mindfulness", "running")
    pub interests: Vec<String>,

    /// Lived-experience areas the user opted to share
    pub experience_areas: Vec<String>,

    /// Preferred communication style (e.g. "listener", "direct")
    pub communication_style: String,

    /// Hours of day the user is typically active
    pub active_hours: Vec<u32>,

    /// Self-reported age range band (e.g. "25-34")
    pub age_range: String,
}

/// Aggregate content interaction counts across the user base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingContent {
    /// Content kind
    pub kind: String,

    /// Interaction count over the trailing window
    pub interactions: u32,
}

/// Clamp a score or confidence to [0.0, 1.0]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}
