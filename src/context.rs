//! Context resolution for the behavior engine
//!
//! Computes a [`ContextSnapshot`] of "now": time-of-day bucket, day of week,
//! and the most recent mood/stress readings. Mood and stress arrive from
//! other app surfaces (mood check-ins, journal sentiment) through the
//! observe hooks and live in a short-lived cache; a stale or absent reading
//! is omitted from the snapshot, never replaced with a fabricated value.
//!
//! Resolution is infallible by design: any internal failure degrades to
//! `TimeOfDay::Unknown` with no mood attached.

use crate::types::{ContextSnapshot, MoodReading, TimeOfDay};
use chrono::{DateTime, Datelike, Duration, Local, Timelike, Utc, Weekday};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Recent observations fed by the host app
#[derive(Debug, Default)]
struct RecentObservations {
    mood: Option<(MoodReading, DateTime<Utc>)>,
    stress_level: Option<(u8, DateTime<Utc>)>,
    anxiety_level: Option<(u8, DateTime<Utc>)>,
}

/// Resolves the current interaction context
///
/// One resolver per engine instance. Cheap to call; reads the process clock
/// and the observation cache only.
pub struct ContextResolver {
    freshness: Duration,
    observations: RwLock<RecentObservations>,
}

impl ContextResolver {
    /// Create a resolver whose observations stay usable for `freshness_minutes`
    pub fn new(freshness_minutes: i64) -> Self {
        Self {
            freshness: Duration::minutes(freshness_minutes),
            observations: RwLock::new(RecentObservations::default()),
        }
    }

    /// Record the latest mood reading (from the mood tracker)
    pub fn observe_mood(&self, emotion: impl Into<String>, confidence: f32) {
        let reading = MoodReading {
            emotion: emotion.into(),
            confidence: confidence.clamp(0.0, 1.0),
        };
        match self.observations.write() {
            Ok(mut obs) => {
                debug!("Observed mood {} ({:.2})", reading.emotion, reading.confidence);
                obs.mood = Some((reading, Utc::now()));
            }
            Err(_) => warn!("Mood observation dropped: cache lock poisoned"),
        }
    }

    /// Record the latest stress/anxiety self-report (0-10 scales)
    pub fn observe_distress(&self, stress_level: Option<u8>, anxiety_level: Option<u8>) {
        match self.observations.write() {
            Ok(mut obs) => {
                let now = Utc::now();
                if let Some(s) = stress_level {
                    obs.stress_level = Some((s.min(10), now));
                }
                if let Some(a) = anxiety_level {
                    obs.anxiety_level = Some((a.min(10), now));
                }
            }
            Err(_) => warn!("Distress observation dropped: cache lock poisoned"),
        }
    }

    /// Resolve the current context from the process clock
    pub fn resolve(&self) -> ContextSnapshot {
        self.resolve_at(Local::now())
    }

    /// Resolve a context for an explicit instant (local time determines the
    /// bucket; the snapshot timestamp is stored in UTC)
    pub fn resolve_at(&self, now: DateTime<Local>) -> ContextSnapshot {
        let hour = now.hour();
        let timestamp = now.with_timezone(&Utc);

        let (mood, stress_level, anxiety_level) = match self.observations.read() {
            Ok(obs) => (
                fresh(&obs.mood, timestamp, self.freshness),
                fresh(&obs.stress_level, timestamp, self.freshness),
                fresh(&obs.anxiety_level, timestamp, self.freshness),
            ),
            Err(_) => {
                // Degrade rather than raise: an unreadable cache yields an
                // unknown-context snapshot.
                warn!("Context resolution degraded: observation lock poisoned");
                return ContextSnapshot {
                    time_of_day: TimeOfDay::Unknown,
                    day_of_week: now.weekday(),
                    hour,
                    mood: None,
                    stress_level: None,
                    anxiety_level: None,
                    timestamp,
                };
            }
        };

        ContextSnapshot {
            time_of_day: TimeOfDay::from_hour(hour),
            day_of_week: now.weekday(),
            hour,
            mood,
            stress_level,
            anxiety_level,
            timestamp,
        }
    }

    /// Current weekday, exposed for cache-maintenance key construction
    pub fn current_weekday(&self) -> Weekday {
        Local::now().weekday()
    }
}

/// Return an observation only while it is within the freshness window
fn fresh<T: Clone>(
    slot: &Option<(T, DateTime<Utc>)>,
    now: DateTime<Utc>,
    freshness: Duration,
) -> Option<T> {
    slot.as_ref().and_then(|(value, observed_at)| {
        if now.signed_duration_since(*observed_at) <= freshness {
            Some(value.clone())
        } else {
            None
        }
    })
}
