//! External service integrations for the Attune behavior engine
//!
//! Currently the optional AI suggestion provider. By contract, nothing in
//! this module surfaces an error to the engine: a failed provider call
//! resolves to `None` and the generator falls back to rule-based scoring.

pub mod suggestions;

pub use suggestions::{
    HttpSuggestionProvider, PeerSuggestion, Suggestion, SuggestionInput, SuggestionProvider,
    SuggestionProviderConfig, SuggestionSet,
};
