#![allow(clippy::missing_docs_in_private_items)]
#![allow(missing_docs)]
use std::collections::HashMap;

use arcstr::Substr;
use smallvec::SmallVec;
use thiserror::Error;

use super::topic_match::{TopicMatch, TopicParameters, TopicPath};
use super::topic_pattern_item::TopicPatternItem;
use super::topic_pattern_path::TopicPatternPath;

/// Errors that can occur during registration or matching
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicTrieError {
	/// Topic path provided for matching is empty
	#[error("Topic path cannot be empty for matching")]
	EmptyTopicPath,

	/// Topic path is longer than the matcher accepts
	#[error("Topic path is {length} bytes, limit is {max}")]
	TopicTooLong { length: usize, max: usize },

	/// Invalid topic segment encountered during matching
	#[error("Invalid topic segment '{segment}' at position {position}")]
	InvalidSegment { segment: String, position: usize },

	/// A `+` position is already bound under a different parameter name
	#[error(
		"Pattern '{pattern}' binds {requested:?} at position {position}, but \
		 that wildcard is already registered as {existing:?}"
	)]
	ParameterConflict {
		pattern: String,
		position: usize,
		existing: Option<String>,
		requested: Option<String>,
	},
}

impl TopicTrieError {
	/// Creates a new InvalidSegment error
	pub fn invalid_segment(
		segment: impl Into<String>,
		position: usize,
	) -> Self {
		Self::InvalidSegment {
			segment: segment.into(),
			position,
		}
	}

	/// Returns true if the error was caused by registration input
	pub fn is_registration_error(&self) -> bool {
		matches!(self, TopicTrieError::ParameterConflict { .. })
	}
}

/// What a trie node stands for in a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSegment {
	/// Sentinel at the top of the trie
	Root,
	/// Exact segment text
	Literal(Substr),
	/// `+`, optionally binding a parameter on the node
	SingleLevel,
	/// `#`, always terminal
	MultiLevel,
}

/// One node of the topic trie.
///
/// Children are kept in a `Vec` in creation order; the side indexes only
/// point into it. Iterating `children` is therefore deterministic, and so is
/// the order of multiple matches for one topic.
#[derive(Debug)]
pub struct TopicNode<T> {
	segment: NodeSegment,
	parameter: Option<Substr>,
	data: Option<T>,
	children: Vec<TopicNode<T>>,
	literal_children: HashMap<Substr, usize>,
	single_level_child: Option<usize>,
	multi_level_child: Option<usize>,
}

impl<T> TopicNode<T> {
	fn new(segment: NodeSegment, parameter: Option<Substr>) -> Self {
		Self {
			segment,
			parameter,
			data: None,
			children: Vec::new(),
			literal_children: HashMap::new(),
			single_level_child: None,
			multi_level_child: None,
		}
	}

	pub fn segment(&self) -> &NodeSegment {
		&self.segment
	}

	pub fn parameter(&self) -> Option<&Substr> {
		self.parameter.as_ref()
	}

	pub fn data(&self) -> Option<&T> {
		self.data.as_ref()
	}

	pub fn children(&self) -> impl Iterator<Item = &TopicNode<T>> {
		self.children.iter()
	}

	fn child_index(&self, item: &TopicPatternItem) -> Option<usize> {
		match item {
			| TopicPatternItem::Str(s) => {
				self.literal_children.get(s).copied()
			}
			| TopicPatternItem::Plus(_) => self.single_level_child,
			| TopicPatternItem::Hash => self.multi_level_child,
		}
	}

	fn child(&self, item: &TopicPatternItem) -> Option<&TopicNode<T>> {
		self.child_index(item).map(|i| &self.children[i])
	}

	/// Descends to the child for `item`, creating it if absent.
	fn child_or_insert(&mut self, item: &TopicPatternItem) -> &mut Self {
		let index = match self.child_index(item) {
			| Some(index) => index,
			| None => {
				let index = self.children.len();
				let node = match item {
					| TopicPatternItem::Str(s) => {
						self.literal_children.insert(s.clone(), index);
						TopicNode::new(NodeSegment::Literal(s.clone()), None)
					}
					| TopicPatternItem::Plus(name) => {
						self.single_level_child = Some(index);
						TopicNode::new(NodeSegment::SingleLevel, name.clone())
					}
					| TopicPatternItem::Hash => {
						self.multi_level_child = Some(index);
						TopicNode::new(NodeSegment::MultiLevel, None)
					}
				};
				self.children.push(node);
				index
			}
		};
		&mut self.children[index]
	}

	/// Walks this node against the topic starting at `parts[0]`.
	///
	/// `parts` is never empty here: the root fans out the whole topic and
	/// inner nodes only recurse while segments remain.
	fn collect_matches<'a>(
		&'a self,
		parts: &[Substr],
		parameters: &TopicParameters,
		matches: &mut Vec<TopicMatch<'a, T>>,
	) {
		let [segment, rest @ ..] = parts else {
			return;
		};

		let bound;
		let parameters = match &self.segment {
			| NodeSegment::MultiLevel => {
				self.push_match(parameters, matches);
				return;
			}
			| NodeSegment::Literal(literal) if literal != segment => return,
			| NodeSegment::SingleLevel => match &self.parameter {
				| Some(name) => {
					let mut local = parameters.clone();
					local.insert(name.clone(), segment.clone());
					bound = local;
					&bound
				}
				| None => parameters,
			},
			| _ => parameters,
		};

		if rest.is_empty() {
			// Topic consumed here: this node's own route, then a trailing
			// `#` that matches zero further levels.
			self.push_match(parameters, matches);
			if let Some(index) = self.multi_level_child {
				self.children[index].push_match(parameters, matches);
			}
		} else {
			self.fan_out(rest, parameters, matches);
		}
	}

	/// Tries every child that can continue the match, in creation order.
	fn fan_out<'a>(
		&'a self,
		parts: &[Substr],
		parameters: &TopicParameters,
		matches: &mut Vec<TopicMatch<'a, T>>,
	) {
		let Some(segment) = parts.first() else {
			return;
		};
		let mut candidates: SmallVec<[usize; 3]> = [
			self.literal_children.get(segment).copied(),
			self.single_level_child,
			self.multi_level_child,
		]
		.into_iter()
		.flatten()
		.collect();
		candidates.sort_unstable();

		for index in candidates {
			self.children[index].collect_matches(parts, parameters, matches);
		}
	}

	fn push_match<'a>(
		&'a self,
		parameters: &TopicParameters,
		matches: &mut Vec<TopicMatch<'a, T>>,
	) {
		if let Some(data) = &self.data {
			matches.push(TopicMatch {
				data,
				parameters: parameters.clone(),
			});
		}
	}

	fn collect_patterns<'a>(
		&'a self,
		current_path: &mut Vec<String>,
		result: &mut Vec<(String, &'a T)>,
	) {
		let pushed = match &self.segment {
			| NodeSegment::Root => false,
			| NodeSegment::Literal(s) => {
				current_path.push(s.to_string());
				true
			}
			| NodeSegment::SingleLevel => {
				current_path.push(
					TopicPatternItem::Plus(self.parameter.clone())
						.as_template()
						.into_owned(),
				);
				true
			}
			| NodeSegment::MultiLevel => {
				current_path.push("#".to_string());
				true
			}
		};
		if let Some(data) = &self.data {
			result.push((current_path.join("/"), data));
		}
		for child in &self.children {
			child.collect_patterns(current_path, result);
		}
		if pushed {
			current_path.pop();
		}
	}
}

/// Trie of registered topic patterns.
///
/// Literal segments, `+` and `#` each get their own child slot; a pattern's
/// data lives on the node reached by its last segment.
#[derive(Debug)]
pub struct TopicTrie<T> {
	root: TopicNode<T>,
	len: usize,
}

impl<T> Default for TopicTrie<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> TopicTrie<T> {
	/// Creates a new empty trie
	pub fn new() -> Self {
		Self {
			root: TopicNode::new(NodeSegment::Root, None),
			len: 0,
		}
	}

	/// Number of registered patterns
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn root(&self) -> &TopicNode<T> {
		&self.root
	}

	/// Stores `data` for `pattern`.
	///
	/// Returns the data previously stored for the same pattern, which is
	/// replaced. Fails without touching the trie if a `+` position on the
	/// pattern's path is already bound under a different parameter name.
	pub fn register(
		&mut self,
		pattern: &TopicPatternPath,
		data: T,
	) -> Result<Option<T>, TopicTrieError> {
		self.check_parameter_conflicts(pattern)?;

		let mut current_node = &mut self.root;
		for segment in pattern.iter() {
			current_node = current_node.child_or_insert(segment);
		}
		let previous = current_node.data.replace(data);
		if previous.is_none() {
			self.len += 1;
		}
		Ok(previous)
	}

	fn check_parameter_conflicts(
		&self,
		pattern: &TopicPatternPath,
	) -> Result<(), TopicTrieError> {
		let mut current_node = &self.root;
		for (position, segment) in pattern.iter().enumerate() {
			let Some(child) = current_node.child(segment) else {
				return Ok(());
			};
			if let TopicPatternItem::Plus(requested) = segment {
				if child.parameter != *requested {
					return Err(TopicTrieError::ParameterConflict {
						pattern: pattern.topic_pattern().to_string(),
						position,
						existing: child.parameter.as_ref().map(|s| s.to_string()),
						requested: requested.as_ref().map(|s| s.to_string()),
					});
				}
			}
			current_node = child;
		}
		Ok(())
	}

	/// Data registered for exactly this pattern, if any.
	pub fn get(&self, pattern: &TopicPatternPath) -> Option<&T> {
		let mut current_node = &self.root;
		for segment in pattern.iter() {
			current_node = current_node.child(segment)?;
		}
		current_node.data.as_ref()
	}

	/// Every registration matching `topic`, in deterministic trie order.
	pub fn find<'a>(&'a self, topic: &TopicPath) -> Vec<TopicMatch<'a, T>> {
		let mut matches = Vec::new();
		self.root.fan_out(
			&topic.segments,
			&TopicParameters::new(),
			&mut matches,
		);
		matches
	}

	/// Registered patterns as written (names included) with their data,
	/// depth-first in creation order.
	pub fn patterns(&self) -> Vec<(String, &T)> {
		let mut result = Vec::with_capacity(self.len);
		self.root.collect_patterns(&mut Vec::new(), &mut result);
		result
	}

	/// Drops every registration
	pub fn clear(&mut self) {
		self.root = TopicNode::new(NodeSegment::Root, None);
		self.len = 0;
	}
}
