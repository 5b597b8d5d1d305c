//! Interaction recording with a bounded local window.
//!
//! The recorder owns the in-memory event log and session bookkeeping. Events
//! are immutable once built; the window keeps the most recent N and evicts
//! from the front. Forwarding to the durable store and preference updates are
//! orchestrated by the engine — the recorder itself never does I/O, which is
//! what makes `track_interaction` local-first.

use crate::types::{ContextSnapshot, EventId, InteractionEvent, Payload, TrackOptions};
use crate::learning::preferences::{payload_completed, payload_rating};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashSet, VecDeque};
use tracing::debug;
use uuid::Uuid;

/// Bounded append-only window of recent interaction events
pub struct InteractionRecorder {
    window: VecDeque<InteractionEvent>,
    capacity: usize,
    session_gap: Duration,
    current_session: String,
    last_event_at: Option<DateTime<Utc>>,
    total_recorded: u64,
}

impl InteractionRecorder {
    /// Create a recorder retaining at most `capacity` events with the given
    /// session inactivity gap in minutes
    pub fn new(capacity: usize, session_gap_minutes: i64) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            session_gap: Duration::minutes(session_gap_minutes),
            current_session: new_session_id(),
            last_event_at: None,
            total_recorded: 0,
        }
    }

    /// Build and append an event for the given kind/payload/context.
    ///
    /// A new session id is minted when the gap since the last event exceeds
    /// the configured threshold; `options.session_id` overrides the
    /// heuristic entirely.
    pub fn record(
        &mut self,
        kind: &str,
        payload: Payload,
        context: ContextSnapshot,
        options: &TrackOptions,
    ) -> InteractionEvent {
        let timestamp = options.timestamp.unwrap_or(context.timestamp);
        let session_id = match &options.session_id {
            Some(forced) => {
                self.current_session = forced.clone();
                forced.clone()
            }
            None => self.session_for(timestamp),
        };

        let user_rating = payload_rating(&payload);
        let effectiveness_score = match (user_rating, payload_completed(&payload)) {
            (Some(r), _) => Some((r as f32 / 5.0).clamp(0.0, 1.0)),
            (None, Some(true)) => Some(1.0),
            (None, Some(false)) => Some(0.0),
            (None, None) => None,
        };

        let event = InteractionEvent {
            id: EventId::new(),
            kind: kind.to_string(),
            payload,
            timestamp,
            context,
            session_id,
            effectiveness_score,
            user_rating,
        };

        self.last_event_at = Some(timestamp);
        self.total_recorded += 1;
        self.push(event.clone());

        debug!(
            "Recorded {} in session {} ({} in window)",
            event.kind,
            event.session_id,
            self.window.len()
        );
        event
    }

    /// Session id for an event at `timestamp`, minting a new one when the
    /// inactivity gap is exceeded
    fn session_for(&mut self, timestamp: DateTime<Utc>) -> String {
        if let Some(last) = self.last_event_at {
            if timestamp.signed_duration_since(last) > self.session_gap {
                self.current_session = new_session_id();
                debug!("Session gap exceeded, new session {}", self.current_session);
            }
        }
        self.current_session.clone()
    }

    fn push(&mut self, event: InteractionEvent) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(event);
    }

    /// Merge durably-stored events into the window.
    ///
    /// Used on load: the durable store is the source of truth across
    /// restarts, but locally-recorded events are kept, not overwritten.
    /// Events dedup by id; the window keeps the most recent `capacity` in
    /// timestamp order.
    pub fn merge_durable(&mut self, durable: Vec<InteractionEvent>) {
        let seen: HashSet<EventId> = self.window.iter().map(|e| e.id).collect();
        let mut all: Vec<InteractionEvent> = self.window.drain(..).collect();
        all.extend(durable.into_iter().filter(|e| !seen.contains(&e.id)));
        all.sort_by_key(|e| e.timestamp);

        let skip = all.len().saturating_sub(self.capacity);
        self.window.extend(all.into_iter().skip(skip));

        if let Some(last) = self.window.back() {
            self.last_event_at = Some(last.timestamp);
            self.current_session = last.session_id.clone();
        }
    }

    /// Events currently in the window, oldest first
    pub fn events(&self) -> impl Iterator<Item = &InteractionEvent> {
        self.window.iter()
    }

    /// Number of events in the window
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Total events recorded through this recorder (not bounded by the window)
    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    /// Current session id
    pub fn session_id(&self) -> &str {
        &self.current_session
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
