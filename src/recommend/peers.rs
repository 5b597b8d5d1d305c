//! Peer compatibility matching.
//!
//! Computes a multi-signal compatibility score between the user and each
//! candidate peer:
//!
//! `0.30 * interest_jaccard + 0.25 * experience_jaccard + 0.20 * comm_style
//! + 0.15 * activity_overlap + 0.10 * age_range`
//!
//! Scores above 0.7 yield support-partner candidates; 0.5 - 0.7 yield
//! mentor-connection candidates; anything lower is dropped. AI-provided peer
//! suggestions merge by peer id, with algorithmic entries appended only when
//! their id is new.

use crate::services::suggestions::PeerSuggestion;
use crate::types::{clamp01, PeerConnection, PeerMatch, SourceTag, UserProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const W_INTERESTS: f32 = 0.30;
const W_EXPERIENCE: f32 = 0.25;
const W_COMM_STYLE: f32 = 0.20;
const W_ACTIVITY: f32 = 0.15;
const W_AGE_RANGE: f32 = 0.10;

/// Support-partner threshold (exclusive)
const PARTNER_THRESHOLD: f32 = 0.7;

/// Mentor-connection threshold (inclusive)
const MENTOR_THRESHOLD: f32 = 0.5;

/// A candidate peer supplied by the persistence gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerCandidate {
    /// Stable peer id
    pub id: String,

    /// Declared interests
    pub interests: Vec<String>,

    /// Lived-experience areas
    pub experience_areas: Vec<String>,

    /// Communication style label
    pub communication_style: String,

    /// Hours of day this peer is typically active
    pub active_hours: Vec<u32>,

    /// Age range band
    pub age_range: String,
}

/// Rule-based peer matcher
pub struct PeerMatcher;

impl PeerMatcher {
    /// Compatibility score between a user and one candidate, clamped to [0, 1]
    pub fn compatibility(user: &UserProfile, candidate: &PeerCandidate) -> f32 {
        let interests = jaccard(&user.interests, &candidate.interests);
        let experience = jaccard(&user.experience_areas, &candidate.experience_areas);
        let comm_style = if !user.communication_style.is_empty()
            && user
                .communication_style
                .eq_ignore_ascii_case(&candidate.communication_style)
        {
            1.0
        } else {
            0.5
        };
        let activity = hour_overlap(&user.active_hours, &candidate.active_hours);
        let age_range = if !user.age_range.is_empty() && user.age_range == candidate.age_range {
            1.0
        } else {
            0.3
        };

        clamp01(
            W_INTERESTS * interests
                + W_EXPERIENCE * experience
                + W_COMM_STYLE * comm_style
                + W_ACTIVITY * activity
                + W_AGE_RANGE * age_range,
        )
    }

    /// Score all candidates and keep those above the mentor threshold,
    /// sorted by score descending
    pub fn matches(user: &UserProfile, candidates: &[PeerCandidate]) -> Vec<PeerMatch> {
        let mut matches: Vec<PeerMatch> = candidates
            .iter()
            .filter_map(|candidate| {
                let score = Self::compatibility(user, candidate);
                connection_for(score).map(|connection| PeerMatch {
                    peer_id: candidate.id.clone(),
                    score,
                    connection,
                    source: SourceTag::Rule,
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.peer_id.cmp(&b.peer_id))
        });
        matches
    }

    /// Merge AI peer suggestions with algorithmic matches by peer id.
    ///
    /// AI entries come first; an algorithmic entry is appended only when its
    /// id has not been seen.
    pub fn merge_with_ai(
        ai: Vec<PeerSuggestion>,
        algorithmic: Vec<PeerMatch>,
    ) -> Vec<PeerMatch> {
        let mut merged: Vec<PeerMatch> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for suggestion in ai {
            if seen.insert(suggestion.peer_id.clone()) {
                let score = clamp01(suggestion.score);
                merged.push(PeerMatch {
                    peer_id: suggestion.peer_id,
                    score,
                    connection: if score > PARTNER_THRESHOLD {
                        PeerConnection::SupportPartner
                    } else {
                        PeerConnection::MentorConnection
                    },
                    source: SourceTag::Ai,
                });
            }
        }

        for candidate in algorithmic {
            if seen.insert(candidate.peer_id.clone()) {
                merged.push(candidate);
            }
        }

        merged
    }
}

/// Connection tier for a compatibility score, if any
fn connection_for(score: f32) -> Option<PeerConnection> {
    if score > PARTNER_THRESHOLD {
        Some(PeerConnection::SupportPartner)
    } else if score >= MENTOR_THRESHOLD {
        Some(PeerConnection::MentorConnection)
    } else {
        None
    }
}

/// Jaccard similarity over case-insensitive string sets
fn jaccard(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: HashSet<String> = a.iter().map(|s| s.to_lowercase()).collect();
    let set_b: HashSet<String> = b.iter().map(|s| s.to_lowercase()).collect();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Jaccard similarity over active-hour sets
fn hour_overlap(a: &[u32], b: &[u32]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: HashSet<u32> = a.iter().copied().collect();
    let set_b: HashSet<u32> = b.iter().copied().collect();

    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserProfile {
        UserProfile {
            user_id: "u1".into(),
            interests: vec!["mindfulness".into(), "running".into(), "reading".into()],
            experience_areas: vec!["anxiety".into(), "burnout".into()],
            communication_style: "listener".into(),
            active_hours: vec![7, 8, 21, 22],
            age_range: "25-34".into(),
        }
    }

    fn twin() -> PeerCandidate {
        PeerCandidate {
            id: "p-twin".into(),
            interests: vec!["mindfulness".into(), "running".into(), "reading".into()],
            experience_areas: vec!["anxiety".into(), "burnout".into()],
            communication_style: "listener".into(),
            active_hours: vec![7, 8, 21, 22],
            age_range: "25-34".into(),
        }
    }

    fn stranger() -> PeerCandidate {
        PeerCandidate {
            id: "p-stranger".into(),
            interests: vec!["chess".into()],
            experience_areas: vec!["grief".into()],
            communication_style: "direct".into(),
            active_hours: vec![2, 3],
            age_range: "55-64".into(),
        }
    }

    #[test]
    fn test_identical_profiles_score_high() {
        let score = PeerMatcher::compatibility(&user(), &twin());
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_profiles_score_low() {
        // Only the 0.5 comm-style floor and 0.3 age floor contribute:
        // 0.20*0.5 + 0.10*0.3 = 0.13
        let score = PeerMatcher::compatibility(&user(), &stranger());
        assert!((score - 0.13).abs() < 1e-6);
    }

    #[test]
    fn test_matches_tiered_and_filtered() {
        let mut partial = twin();
        partial.id = "p-partial".into();
        partial.interests = vec!["mindfulness".into()];
        partial.experience_areas = vec!["anxiety".into(), "grief".into(), "sleep".into()];
        partial.age_range = "35-44".into();

        let matches = PeerMatcher::matches(&user(), &[twin(), partial, stranger()]);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].peer_id, "p-twin");
        assert_eq!(matches[0].connection, PeerConnection::SupportPartner);
        assert_eq!(matches[1].peer_id, "p-partial");
        assert_eq!(matches[1].connection, PeerConnection::MentorConnection);
    }

    #[test]
    fn test_merge_with_ai_dedups_by_id() {
        let ai = vec![
            PeerSuggestion { peer_id: "p-twin".into(), score: 0.9, reason: "ai".into() },
            PeerSuggestion { peer_id: "p-new".into(), score: 0.6, reason: "ai".into() },
        ];
        let algorithmic = PeerMatcher::matches(&user(), &[twin()]);

        let merged = PeerMatcher::merge_with_ai(ai, algorithmic);

        // p-twin appears once (AI wins), p-new appended
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].peer_id, "p-twin");
        assert_eq!(merged[0].source, SourceTag::Ai);
        assert_eq!(merged[1].peer_id, "p-new");
        assert_eq!(merged[1].connection, PeerConnection::MentorConnection);
    }

    #[test]
    fn test_scores_clamped() {
        let ai = vec![PeerSuggestion { peer_id: "p".into(), score: 3.0, reason: "r".into() }];
        let merged = PeerMatcher::merge_with_ai(ai, vec![]);
        assert!((merged[0].score - 1.0).abs() < f32::EPSILON);
    }
}
