use std::fmt::Debug;

pub type Coordinates0 = [f64; 2];
pub type Coordinates1 = Vec<Coordinates0>;
pub type Coordinates2 = Vec<Coordinates1>;
pub type Coordinates3 = Vec<Coordinates2>;

/// A geometry in one of the three shapes a vector tile feature can carry.
///
/// Single points, lines and polygons are stored as one-element multi geometries.
/// Polygon rings are closed: the first coordinate is repeated at the end.
#[derive(Clone, PartialEq)]
pub enum Geometry {
	MultiPoint(Coordinates1),
	MultiLineString(Coordinates2),
	MultiPolygon(Coordinates3),
}

impl Geometry {
	#[must_use]
	pub fn new_point(value: Coordinates0) -> Self {
		Self::MultiPoint(vec![value])
	}

	#[must_use]
	pub fn new_line_string(value: Coordinates1) -> Self {
		Self::MultiLineString(vec![value])
	}

	#[must_use]
	pub fn new_polygon(value: Coordinates2) -> Self {
		Self::MultiPolygon(vec![value])
	}

	#[must_use]
	pub fn get_type(&self) -> &'static str {
		match self {
			Geometry::MultiPoint(_) => "MultiPoint",
			Geometry::MultiLineString(_) => "MultiLineString",
			Geometry::MultiPolygon(_) => "MultiPolygon",
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		match self {
			Geometry::MultiPoint(g) => g.is_empty(),
			Geometry::MultiLineString(g) => g.iter().all(Vec::is_empty),
			Geometry::MultiPolygon(g) => g.iter().all(Vec::is_empty),
		}
	}

	/// Applies `f` to every coordinate.
	#[must_use]
	pub fn map_coordinates<F>(self, f: F) -> Geometry
	where
		F: Fn(Coordinates0) -> Coordinates0,
	{
		let map1 = |c: Coordinates1| c.into_iter().map(&f).collect::<Coordinates1>();
		match self {
			Geometry::MultiPoint(g) => Geometry::MultiPoint(map1(g)),
			Geometry::MultiLineString(g) => Geometry::MultiLineString(g.into_iter().map(map1).collect()),
			Geometry::MultiPolygon(g) => Geometry::MultiPolygon(
				g.into_iter()
					.map(|polygon| polygon.into_iter().map(map1).collect())
					.collect(),
			),
		}
	}

	/// `[x_min, y_min, x_max, y_max]` over all coordinates, `None` when empty.
	#[must_use]
	pub fn bbox(&self) -> Option<[f64; 4]> {
		let mut bbox: Option<[f64; 4]> = None;
		let mut add = |c: &Coordinates0| {
			let b = bbox.get_or_insert([c[0], c[1], c[0], c[1]]);
			b[0] = b[0].min(c[0]);
			b[1] = b[1].min(c[1]);
			b[2] = b[2].max(c[0]);
			b[3] = b[3].max(c[1]);
		};
		match self {
			Geometry::MultiPoint(g) => g.iter().for_each(&mut add),
			Geometry::MultiLineString(g) => g.iter().flatten().for_each(&mut add),
			Geometry::MultiPolygon(g) => g.iter().flatten().flatten().for_each(&mut add),
		}
		bbox
	}
}

impl Debug for Geometry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner: &dyn Debug = match self {
			Geometry::MultiPoint(g) => g,
			Geometry::MultiLineString(g) => g,
			Geometry::MultiPolygon(g) => g,
		};
		f.debug_tuple(self.get_type()).field(inner).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bbox_and_map() {
		let g = Geometry::new_line_string(vec![[1.0, 5.0], [3.0, -2.0]]);
		assert_eq!(g.bbox(), Some([1.0, -2.0, 3.0, 5.0]));
		let g = g.map_coordinates(|[x, y]| [x * 2.0, y + 1.0]);
		assert_eq!(g, Geometry::new_line_string(vec![[2.0, 6.0], [6.0, -1.0]]));
		assert_eq!(Geometry::MultiPoint(vec![]).bbox(), None);
	}

	#[test]
	fn empty() {
		assert!(Geometry::MultiPoint(vec![]).is_empty());
		assert!(Geometry::MultiLineString(vec![vec![]]).is_empty());
		assert!(!Geometry::new_point([0.0, 0.0]).is_empty());
	}

	#[test]
	fn debug() {
		assert_eq!(
			format!("{:?}", Geometry::new_point([1.0, 2.0])),
			"MultiPoint([[1.0, 2.0]])"
		);
	}
}
