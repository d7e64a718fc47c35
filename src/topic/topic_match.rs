#![allow(clippy::missing_docs_in_private_items)]
#![allow(missing_docs)]

use std::collections::HashMap;
use std::fmt;

use arcstr::{ArcStr, Substr};
use smallvec::SmallVec;

/// Concrete topic split into its segments.
///
/// Segments share the topic's allocation.
#[derive(Debug, Clone)]
pub struct TopicPath {
	pub path: ArcStr,
	pub segments: Vec<Substr>,
}

impl TopicPath {
	pub fn new(path: ArcStr) -> Self {
		let segments: Vec<Substr> =
			path.split('/').map(|s| path.substr_from(s)).collect();
		Self { path, segments }
	}

	pub fn path(&self) -> ArcStr {
		self.path.clone()
	}
}

impl fmt::Display for TopicPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.path)
	}
}

/// Values captured by named `+name+` wildcards for one match.
///
/// Names are unique within a match. Lookups are linear; patterns rarely
/// bind more than a handful of names.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TopicParameters {
	bindings: SmallVec<[(Substr, Substr); 4]>,
}

impl TopicParameters {
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `name` to `value`, replacing an earlier binding of `name`.
	pub(crate) fn insert(&mut self, name: Substr, value: Substr) {
		match self.bindings.iter_mut().find(|(n, _)| *n == name) {
			| Some(binding) => binding.1 = value,
			| None => self.bindings.push((name, value)),
		}
	}

	/// Returns the segment captured under `name`.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.bindings
			.iter()
			.find(|(n, _)| n.as_str() == name)
			.map(|(_, v)| v.as_str())
	}

	pub fn contains(&self, name: &str) -> bool {
		self.get(name).is_some()
	}

	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}

	/// Iterates `(name, value)` pairs in pattern order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.bindings.iter().map(|(n, v)| (n.as_str(), v.as_str()))
	}

	pub fn to_hash_map(&self) -> HashMap<String, String> {
		self.iter()
			.map(|(n, v)| (n.to_string(), v.to_string()))
			.collect()
	}
}

impl fmt::Debug for TopicParameters {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.iter()).finish()
	}
}

/// One trie hit: the data stored at the matching node plus the parameters
/// captured on the way down.
#[derive(Debug)]
pub struct TopicMatch<'a, T> {
	pub data: &'a T,
	pub parameters: TopicParameters,
}
