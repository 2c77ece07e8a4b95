use crate::geo::Geometry;

/// Wire-level geometry type of a vector tile feature.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum GeomType {
	#[default]
	Unknown = 0,
	MultiPoint = 1,
	MultiLineString = 2,
	MultiPolygon = 3,
}

impl GeomType {
	#[must_use]
	pub fn as_u64(&self) -> u64 {
		*self as u64
	}
}

impl From<u64> for GeomType {
	fn from(value: u64) -> Self {
		match value {
			1 => GeomType::MultiPoint,
			2 => GeomType::MultiLineString,
			3 => GeomType::MultiPolygon,
			_ => GeomType::Unknown,
		}
	}
}

impl From<&Geometry> for GeomType {
	fn from(geometry: &Geometry) -> Self {
		match geometry {
			Geometry::MultiPoint(_) => GeomType::MultiPoint,
			Geometry::MultiLineString(_) => GeomType::MultiLineString,
			Geometry::MultiPolygon(_) => GeomType::MultiPolygon,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_u64() {
		assert_eq!(GeomType::from(0), GeomType::Unknown);
		assert_eq!(GeomType::from(1), GeomType::MultiPoint);
		assert_eq!(GeomType::from(2), GeomType::MultiLineString);
		assert_eq!(GeomType::from(3), GeomType::MultiPolygon);
		assert_eq!(GeomType::from(99), GeomType::Unknown);
		assert_eq!(GeomType::MultiPolygon.as_u64(), 3);
	}

	#[test]
	fn from_geometry() {
		assert_eq!(GeomType::from(&Geometry::new_point([1.0, 2.0])), GeomType::MultiPoint);
		assert_eq!(
			GeomType::from(&Geometry::new_line_string(vec![[1.0, 2.0], [3.0, 4.0]])),
			GeomType::MultiLineString
		);
	}
}
