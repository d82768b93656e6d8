use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;


/// The id of an authenticated user, as resolved from a bearer token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub i64);

/// The id of the entity a relation points at: a post for likes, a user for
/// follows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub i64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseIdError {
	#[error("id is not a number")]
	NotANumber,
	#[error("id must be a positive integer")]
	NotPositive,
}


impl ActorId {
	/// The same user, seen as the target of a relation.
	pub fn as_target(&self) -> TargetId { TargetId(self.0) }
}

impl fmt::Display for ActorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<i64> for ActorId {
	fn from(other: i64) -> Self { Self(other) }
}

impl fmt::Display for TargetId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<i64> for TargetId {
	fn from(other: i64) -> Self { Self(other) }
}

impl FromStr for TargetId {
	type Err = ParseIdError;

	/// Parses a path segment. Only plain positive integers are accepted, so
	/// trailing garbage like `42abc` is rejected.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
			return Err(ParseIdError::NotANumber);
		}
		let id: i64 = s.parse().map_err(|_| ParseIdError::NotANumber)?;
		if id <= 0 {
			return Err(ParseIdError::NotPositive);
		}
		Ok(Self(id))
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_target_id() {
		assert_eq!("42".parse::<TargetId>(), Ok(TargetId(42)));
		assert_eq!("0".parse::<TargetId>(), Err(ParseIdError::NotPositive));
		assert_eq!("-3".parse::<TargetId>(), Err(ParseIdError::NotANumber));
		assert_eq!("42abc".parse::<TargetId>(), Err(ParseIdError::NotANumber));
		assert_eq!("".parse::<TargetId>(), Err(ParseIdError::NotANumber));
		assert_eq!(
			"99999999999999999999".parse::<TargetId>(),
			Err(ParseIdError::NotANumber)
		);
	}
}
