//! MQTT topic pattern item types and functionality

use std::borrow::Cow;
use std::convert::TryFrom;

use arcstr::Substr;
use thiserror::Error;

/// Marker wrapping a named single-level wildcard: `+name+`
const PARAM_MARKER: char = '+';

/// Error types for topic pattern parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicPatternError {
	/// Hash wildcard (#) used not at the end of the pattern
	#[error(
		"Invalid topic pattern '{pattern}': # wildcard can only be the last \
		 segment"
	)]
	HashPosition {
		/// The invalid pattern
		pattern: String,
	},

	/// Wildcard characters (+ or #) used incorrectly
	#[error("Invalid wildcard usage: {usage}")]
	WildcardUsage {
		/// Description of invalid usage
		usage: String,
	},

	/// Same parameter name bound twice in one pattern
	#[error("Parameter '{name}' is bound more than once in '{pattern}'")]
	DuplicateParameter {
		/// Parameter name
		name: String,
		/// The offending pattern
		pattern: String,
	},

	/// Pattern exceeds a structural limit
	#[error("Topic pattern '{pattern}' exceeds limit: {reason}")]
	LimitExceeded {
		/// The offending pattern
		pattern: String,
		/// Which limit was hit
		reason: String,
	},

	/// Empty topic is not valid
	#[error("Topic pattern cannot be empty")]
	EmptyTopic,
}

impl TopicPatternError {
	/// Creates a new HashPosition error
	pub fn hash_position(pattern: impl Into<String>) -> Self {
		Self::HashPosition {
			pattern: pattern.into(),
		}
	}

	/// Creates a new WildcardUsage error
	pub fn wildcard_usage(usage: impl Into<String>) -> Self {
		Self::WildcardUsage {
			usage: usage.into(),
		}
	}

	/// Creates a new DuplicateParameter error
	pub fn duplicate_parameter(
		name: impl Into<String>,
		pattern: impl Into<String>,
	) -> Self {
		Self::DuplicateParameter {
			name: name.into(),
			pattern: pattern.into(),
		}
	}

	/// Creates a new LimitExceeded error
	pub fn limit_exceeded(
		pattern: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Self::LimitExceeded {
			pattern: pattern.into(),
			reason: reason.into(),
		}
	}
}

/// MQTT topic pattern segment: literal string or wildcard
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TopicPatternItem {
	/// Literal string segment
	Str(Substr),
	/// Single-level wildcard `+` or named `+name+`
	Plus(Option<Substr>),
	/// Multi-level wildcard `#`
	Hash,
}

impl TopicPatternItem {
	/// Returns the canonical (wire) form of the item.
	pub fn as_str(&self) -> &str {
		match self {
			| TopicPatternItem::Str(s) => s,
			| TopicPatternItem::Plus(_) => "+",
			| TopicPatternItem::Hash => "#",
		}
	}

	/// Returns the item as it is written in a pattern, names included.
	pub fn as_template(&self) -> Cow<'_, str> {
		match self {
			| TopicPatternItem::Plus(Some(name)) => {
				Cow::Owned(format!("{PARAM_MARKER}{name}{PARAM_MARKER}"))
			}
			| other => Cow::Borrowed(other.as_str()),
		}
	}

	/// Returns parameter name for named wildcards.
	pub fn param_name(&self) -> Option<&Substr> {
		match self {
			| TopicPatternItem::Plus(Some(name)) => Some(name),
			| _ => None,
		}
	}

	/// Returns true if this item is a wildcard (+ or #).
	pub fn is_wildcard(&self) -> bool {
		matches!(self, TopicPatternItem::Plus(_) | TopicPatternItem::Hash)
	}
}

impl std::fmt::Display for TopicPatternItem {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.as_template())
	}
}

impl TryFrom<Substr> for TopicPatternItem {
	type Error = TopicPatternError;

	fn try_from(item: Substr) -> Result<Self, Self::Error> {
		let res = match item.as_str() {
			| "+" => TopicPatternItem::Plus(None),
			| "#" => TopicPatternItem::Hash,
			| s if s.len() > 2
				&& s.starts_with(PARAM_MARKER)
				&& s.ends_with(PARAM_MARKER) =>
			{
				let inner = &s[1 .. s.len() - 1];
				if inner.contains(['+', '#']) {
					return Err(TopicPatternError::wildcard_usage(s));
				}
				TopicPatternItem::Plus(Some(item.substr_from(inner)))
			}
			| s if s.contains(['+', '#']) => {
				return Err(TopicPatternError::wildcard_usage(s));
			}
			| _ => TopicPatternItem::Str(item),
		};
		Ok(res)
	}
}
