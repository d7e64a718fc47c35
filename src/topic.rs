//! Topic handling module
//!
//! This module provides components for working with MQTT topic patterns,
//! including parsing, trie-based matching with named parameter capture, and
//! resolving concrete topics to registered handlers.

// Submodules
pub mod error;
pub mod topic_match;
pub mod topic_pattern_item;
/// Topic pattern parsing and canonicalization
pub mod topic_pattern_path;
pub mod topic_resolver;
pub mod topic_trie;

#[cfg(test)]
mod topic_pattern_item_tests;
#[cfg(test)]
mod topic_pattern_path_tests;

// Re-export commonly used types for convenience
pub use error::{PatternResult, TopicError, TopicResult, TrieResult};
// Re-export constants and validation utilities
pub use error::{limits, validation};
pub use topic_match::{TopicMatch, TopicParameters, TopicPath};
pub use topic_pattern_item::{TopicPatternError, TopicPatternItem};
pub use topic_pattern_path::TopicPatternPath;
pub use topic_resolver::{
	CallbackRequest, CallbackRequests, RouteKind, TopicResolver,
};
pub use topic_trie::{NodeSegment, TopicNode, TopicTrie, TopicTrieError};
