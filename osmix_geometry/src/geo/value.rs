use std::{
	cmp::Ordering,
	fmt::{Debug, Display},
	hash::Hash,
};

/// A typed attribute value, as stored in vector tile layers.
#[derive(Clone, PartialEq)]
pub enum GeoValue {
	Bool(bool),
	Double(f64),
	Float(f32),
	Int(i64),
	String(String),
	UInt(u64),
}

impl GeoValue {
	fn variant_order(&self) -> u8 {
		match self {
			GeoValue::Bool(_) => 0,
			GeoValue::Double(_) => 1,
			GeoValue::Float(_) => 2,
			GeoValue::Int(_) => 3,
			GeoValue::String(_) => 4,
			GeoValue::UInt(_) => 5,
		}
	}

	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			GeoValue::String(s) => Some(s),
			_ => None,
		}
	}
}

impl Debug for GeoValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::String(v) => f.debug_tuple("String").field(v).finish(),
			Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
			Self::Double(v) => f.debug_tuple("Double").field(v).finish(),
			Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
			Self::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
			Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
		}
	}
}

impl From<&str> for GeoValue {
	fn from(value: &str) -> Self {
		GeoValue::String(value.to_string())
	}
}

impl From<&String> for GeoValue {
	fn from(value: &String) -> Self {
		GeoValue::String(value.clone())
	}
}

impl From<String> for GeoValue {
	fn from(value: String) -> Self {
		GeoValue::String(value)
	}
}

impl From<i64> for GeoValue {
	fn from(value: i64) -> Self {
		if value < 0 {
			GeoValue::Int(value)
		} else {
			GeoValue::UInt(value as u64)
		}
	}
}

impl From<u64> for GeoValue {
	fn from(value: u64) -> Self {
		GeoValue::UInt(value)
	}
}

impl From<f64> for GeoValue {
	fn from(value: f64) -> Self {
		GeoValue::Double(value)
	}
}

impl From<bool> for GeoValue {
	fn from(value: bool) -> Self {
		GeoValue::Bool(value)
	}
}

impl Eq for GeoValue {}

impl Hash for GeoValue {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		core::mem::discriminant(self).hash(state);
		match self {
			GeoValue::Bool(v) => v.hash(state),
			GeoValue::Double(v) => v.to_bits().hash(state),
			GeoValue::Float(v) => v.to_bits().hash(state),
			GeoValue::Int(v) => v.hash(state),
			GeoValue::String(v) => v.hash(state),
			GeoValue::UInt(v) => v.hash(state),
		}
	}
}

impl PartialOrd for GeoValue {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for GeoValue {
	fn cmp(&self, other: &Self) -> Ordering {
		use GeoValue::*;
		match (self, other) {
			(String(a), String(b)) => a.cmp(b),
			(Float(a), Float(b)) => a.total_cmp(b),
			(Double(a), Double(b)) => a.total_cmp(b),
			(Int(a), Int(b)) => a.cmp(b),
			(UInt(a), UInt(b)) => a.cmp(b),
			(Bool(a), Bool(b)) => a.cmp(b),
			_ => self.variant_order().cmp(&other.variant_order()),
		}
	}
}

impl Display for GeoValue {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			GeoValue::Bool(v) => write!(f, "{v}"),
			GeoValue::Double(v) => write!(f, "{v}"),
			GeoValue::Float(v) => write!(f, "{v}"),
			GeoValue::Int(v) => write!(f, "{v}"),
			GeoValue::String(v) => write!(f, "{v}"),
			GeoValue::UInt(v) => write!(f, "{v}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn conversions() {
		assert_eq!(GeoValue::from("a"), GeoValue::String("a".into()));
		assert_eq!(GeoValue::from(-3i64), GeoValue::Int(-3));
		assert_eq!(GeoValue::from(3i64), GeoValue::UInt(3));
		assert_eq!(GeoValue::from(true), GeoValue::Bool(true));
		assert_eq!(GeoValue::from(1.5), GeoValue::Double(1.5));
	}

	#[test]
	fn ordering() {
		let mut values = vec![
			GeoValue::from("b"),
			GeoValue::UInt(2),
			GeoValue::from("a"),
			GeoValue::Bool(false),
			GeoValue::UInt(1),
		];
		values.sort();
		assert_eq!(
			values,
			vec![
				GeoValue::Bool(false),
				GeoValue::from("a"),
				GeoValue::from("b"),
				GeoValue::UInt(1),
				GeoValue::UInt(2),
			]
		);
	}

	#[test]
	fn display() {
		assert_eq!(GeoValue::from("x").to_string(), "x");
		assert_eq!(GeoValue::Int(-7).to_string(), "-7");
		assert_eq!(GeoValue::Float(0.5).to_string(), "0.5");
		assert_eq!(GeoValue::from("x").as_str(), Some("x"));
		assert_eq!(GeoValue::UInt(1).as_str(), None);
	}
}
