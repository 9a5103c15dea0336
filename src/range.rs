use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

use crate::{PropertyError, Result};

/// Inclusive numeric interval.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct Range {
	min: f64,
	max: f64,
}

#[derive(Deserialize)]
struct RawRange {
	min: f64,
	max: f64,
}

impl TryFrom<RawRange> for Range {
	type Error = PropertyError;
	fn try_from(raw: RawRange) -> Result<Self> {
		Range::new(raw.min, raw.max)
	}
}

impl Range {
	pub fn new(min: f64, max: f64) -> Result<Self> {
		if min.is_nan() || max.is_nan() || min > max {
			return Err(PropertyError::Configuration(format!(
				"range min {min} must not exceed max {max}"
			)));
		}

		Ok(Range { min, max })
	}

	pub fn min(&self) -> f64 {
		self.min
	}

	pub fn max(&self) -> f64 {
		self.max
	}

	pub fn length(&self) -> f64 {
		self.max - self.min
	}

	pub fn contains(&self, value: f64) -> bool {
		value >= self.min && value <= self.max
	}

	pub fn contains_range(&self, other: &Range) -> bool {
		self.min <= other.min && other.max <= self.max
	}

	pub fn constrain(&self, value: f64) -> f64 {
		value.clamp(self.min, self.max)
	}
}

impl Debug for Range {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Range({}, {})", self.min, self.max)
	}
}

impl Display for Range {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "[{}, {}]", self.min, self.max)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_inverted_bounds() {
		assert!(Range::new(2.0, 1.0).is_err());
		assert!(Range::new(f64::NAN, 1.0).is_err());
		assert!(Range::new(1.0, 1.0).is_ok());
	}

	#[test]
	fn contains_is_inclusive() {
		let r = Range::new(5.0, 10.0).unwrap();
		assert!(r.contains(5.0));
		assert!(r.contains(10.0));
		assert!(!r.contains(10.5));
		assert_eq!(r.constrain(12.0), 10.0);
		assert_eq!(r.length(), 5.0);
	}
}
