//! Clipping geometries against an axis-aligned rectangle.
//!
//! Points are filtered, lines are cut with [`BooleanOps::clip`], polygons are intersected
//! with [`BooleanOps::intersection`]. Geometries that already lie inside the rectangle are
//! returned untouched.

use crate::{
	geo::{Coordinates1, Coordinates2, Geometry},
	math::orient_polygon,
};
use ::geo::{BooleanOps, Coord, LineString, MultiLineString, MultiPolygon, Polygon, Rect};

fn to_line_string(coordinates: Coordinates1) -> LineString<f64> {
	LineString::from(coordinates)
}

fn from_line_string(line_string: &LineString<f64>) -> Coordinates1 {
	line_string.coords().map(|c| [c.x, c.y]).collect()
}

fn to_polygon(mut rings: Coordinates2) -> Option<Polygon<f64>> {
	if rings.is_empty() {
		return None;
	}
	let exterior = to_line_string(rings.remove(0));
	Some(Polygon::new(exterior, rings.into_iter().map(to_line_string).collect()))
}

fn from_polygon(polygon: &Polygon<f64>) -> Coordinates2 {
	let mut rings = vec![from_line_string(polygon.exterior())];
	rings.extend(polygon.interiors().iter().map(from_line_string));
	rings
}

/// Clips `geometry` to `rect` (`[x_min, y_min, x_max, y_max]`).
///
/// Returns `None` when nothing of the geometry remains. Polygon output is oriented with
/// positive exterior and negative interior ring area.
#[must_use]
pub fn clip_geometry(geometry: Geometry, rect: [f64; 4]) -> Option<Geometry> {
	let [x_min, y_min, x_max, y_max] = rect;
	let bbox = geometry.bbox()?;
	if bbox[2] < x_min || bbox[0] > x_max || bbox[3] < y_min || bbox[1] > y_max {
		return None;
	}
	let inside = bbox[0] >= x_min && bbox[2] <= x_max && bbox[1] >= y_min && bbox[3] <= y_max;

	let clip_polygon = Rect::new(Coord { x: x_min, y: y_min }, Coord { x: x_max, y: y_max }).to_polygon();

	let result = match geometry {
		Geometry::MultiPoint(points) => Geometry::MultiPoint(
			points
				.into_iter()
				.filter(|p| p[0] >= x_min && p[0] <= x_max && p[1] >= y_min && p[1] <= y_max)
				.collect(),
		),
		Geometry::MultiLineString(lines) => {
			if inside {
				Geometry::MultiLineString(lines)
			} else {
				let lines = MultiLineString::new(lines.into_iter().map(to_line_string).collect());
				let clipped = clip_polygon.clip(&lines, false);
				Geometry::MultiLineString(
					clipped
						.0
						.iter()
						.map(from_line_string)
						.filter(|line| line.len() >= 2)
						.collect(),
				)
			}
		}
		Geometry::MultiPolygon(polygons) => {
			let mut polygons: Vec<Coordinates2> = if inside {
				polygons
			} else {
				let subject = MultiPolygon::new(polygons.into_iter().filter_map(to_polygon).collect());
				subject
					.intersection(&clip_polygon)
					.0
					.iter()
					.map(from_polygon)
					.collect()
			};
			polygons.retain(|polygon| polygon.first().is_some_and(|ring| ring.len() >= 4));
			for polygon in &mut polygons {
				polygon.retain(|ring| ring.len() >= 4);
				orient_polygon(polygon);
			}
			Geometry::MultiPolygon(polygons)
		}
	};

	if result.is_empty() { None } else { Some(result) }
}
