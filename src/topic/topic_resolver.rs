use std::num::NonZeroUsize;
use std::sync::Arc;

use arcstr::ArcStr;
use lru::LruCache;
use tracing::{debug, trace, warn};

use super::error::{TopicResult, validation};
use super::topic_match::{TopicParameters, TopicPath};
use super::topic_pattern_path::TopicPatternPath;
use super::topic_trie::TopicTrie;

/// Whether a route always fires or only when nothing else matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteKind {
	/// Fires whenever its pattern matches
	#[default]
	Primary,
	/// Fires only if no primary route matched the topic
	Fallback,
}

/// One handler invocation owed to an incoming message.
///
/// Produced by [`TopicResolver::lookup`], consumed once by the dispatch
/// queue.
#[derive(Debug, Clone)]
pub struct CallbackRequest<T> {
	/// Handler registered for the matching pattern
	pub handler: T,
	/// Concrete topic the message arrived on
	pub topic: ArcStr,
	/// Values captured by named wildcards
	pub parameters: TopicParameters,
}

/// Shared, immutable lookup result.
pub type CallbackRequests<T> = Arc<[CallbackRequest<T>]>;

#[derive(Debug)]
struct Registration<T> {
	handler: T,
	kind: RouteKind,
}

/// Maps topic patterns to handlers and concrete topics to the handlers owed.
///
/// Lookups are memoized per concrete topic in an LRU cache. Every
/// registration clears the cache, so a route added at runtime is visible to
/// the very next lookup. Callers sharing a resolver across threads must
/// serialize access (it takes `&mut self` for both operations).
#[derive(Debug)]
pub struct TopicResolver<T> {
	trie: TopicTrie<Registration<T>>,
	lookup_cache: Option<LruCache<ArcStr, CallbackRequests<T>>>,
}

impl<T: Clone> Default for TopicResolver<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Clone> TopicResolver<T> {
	/// Resolver without lookup memoization
	pub fn new() -> Self {
		Self {
			trie: TopicTrie::new(),
			lookup_cache: None,
		}
	}

	/// Resolver memoizing up to `capacity` distinct topics
	pub fn with_cache(capacity: NonZeroUsize) -> Self {
		Self {
			trie: TopicTrie::new(),
			lookup_cache: Some(LruCache::new(capacity)),
		}
	}

	/// Registers `handler` for `pattern`, returning the canonical pattern to
	/// subscribe with.
	pub fn register(&mut self, pattern: &str, handler: T) -> TopicResult<ArcStr> {
		let pattern = TopicPatternPath::new_from_string(pattern)?;
		self.register_pattern(&pattern, handler, RouteKind::Primary)
	}

	/// Registers a handler that only fires when no primary route matches.
	pub fn register_fallback(
		&mut self,
		pattern: &str,
		handler: T,
	) -> TopicResult<ArcStr> {
		let pattern = TopicPatternPath::new_from_string(pattern)?;
		self.register_pattern(&pattern, handler, RouteKind::Fallback)
	}

	/// Registers an already parsed pattern.
	///
	/// Registering the same pattern again replaces the earlier handler.
	pub fn register_pattern(
		&mut self,
		pattern: &TopicPatternPath,
		handler: T,
		kind: RouteKind,
	) -> TopicResult<ArcStr> {
		let previous = self.trie.register(pattern, Registration { handler, kind })?;
		if previous.is_some() {
			warn!(
				pattern = %pattern,
				"Pattern registered again, previous handler replaced"
			);
		}
		if let Some(cache) = self.lookup_cache.as_mut() {
			cache.clear();
		}
		debug!(
			pattern = %pattern,
			subscription = %pattern.mqtt_pattern(),
			kind = ?kind,
			"Route registered"
		);
		Ok(pattern.mqtt_pattern())
	}

	/// Resolves a concrete topic to the handlers that must run for it, in
	/// trie order.
	pub fn lookup(&mut self, topic: &str) -> TopicResult<CallbackRequests<T>> {
		if let Some(cached) = self
			.lookup_cache
			.as_mut()
			.and_then(|cache| cache.get(topic))
		{
			trace!(topic, "Lookup served from cache");
			return Ok(Arc::clone(cached));
		}

		validation::validate_topic_path(topic)?;
		let topic = ArcStr::from(topic);
		let requests = self.resolve(&TopicPath::new(topic.clone()));
		if let Some(cache) = self.lookup_cache.as_mut() {
			cache.put(topic, Arc::clone(&requests));
		}
		Ok(requests)
	}

	fn resolve(&self, topic: &TopicPath) -> CallbackRequests<T> {
		let matches = self.trie.find(topic);
		let has_primary = matches
			.iter()
			.any(|m| m.data.kind == RouteKind::Primary);
		let requests: Vec<_> = matches
			.into_iter()
			.filter(|m| !has_primary || m.data.kind == RouteKind::Primary)
			.map(|m| CallbackRequest {
				handler: m.data.handler.clone(),
				topic: topic.path(),
				parameters: m.parameters,
			})
			.collect();
		trace!(topic = %topic, matches = requests.len(), "Topic resolved");
		requests.into()
	}

	/// Number of registered patterns
	pub fn len(&self) -> usize {
		self.trie.len()
	}

	pub fn is_empty(&self) -> bool {
		self.trie.is_empty()
	}

	/// Number of memoized topics
	pub fn cached_topics(&self) -> usize {
		self.lookup_cache.as_ref().map_or(0, LruCache::len)
	}

	/// Registered patterns as written, in trie order.
	pub fn patterns(&self) -> Vec<String> {
		self.trie
			.patterns()
			.into_iter()
			.map(|(pattern, _)| pattern)
			.collect()
	}
}
