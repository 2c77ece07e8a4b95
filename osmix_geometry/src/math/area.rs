use crate::geo::{Coordinates1, Coordinates2};

/// Twice the signed area of a ring.
///
/// Positive when the ring turns counter-clockwise in a y-up plane, which is clockwise
/// in tile space (y down): the orientation vector tiles require for exterior rings.
#[must_use]
pub fn area_ring(c: &Coordinates1) -> f64 {
	let Some(mut p2) = c.last() else {
		return 0.0;
	};
	let mut sum = 0f64;
	for p1 in c {
		sum += (p2[0] - p1[0]) * (p1[1] + p2[1]);
		p2 = p1;
	}
	sum
}

/// Twice the area of the exterior ring minus its holes, signed like the exterior ring.
#[must_use]
pub fn area_polygon(c: &Coordinates2) -> f64 {
	let mut rings = c.iter();
	let Some(outer) = rings.next() else {
		return 0.0;
	};
	let mut sum = area_ring(outer);
	for ring in rings {
		sum -= area_ring(ring).abs() * sum.signum();
	}
	sum
}

/// Reorients a polygon so the exterior ring has positive and every hole negative area.
pub fn orient_polygon(polygon: &mut Coordinates2) {
	for (i, ring) in polygon.iter_mut().enumerate() {
		let area = area_ring(ring);
		if (i == 0 && area < 0.0) || (i > 0 && area > 0.0) {
			ring.reverse();
		}
	}
}

/// Ray casting point-in-ring test.
#[must_use]
pub fn ring_contains(ring: &Coordinates1, point: [f64; 2]) -> bool {
	let [px, py] = point;
	let mut inside = false;
	for pair in ring.windows(2) {
		let [x1, y1] = pair[0];
		let [x2, y2] = pair[1];
		if (y1 > py) != (y2 > py) && px < x1 + (x2 - x1) * (py - y1) / (y2 - y1) {
			inside = !inside;
		}
	}
	inside
}
