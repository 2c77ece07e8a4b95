/// Mean earth radius in meters (IUGG).
pub const EARTH_RADIUS: f64 = 6_371_008.8;

/// Great-circle distance in meters between two `[lon, lat]` positions in degrees.
#[must_use]
pub fn haversine_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
	let lat1 = a[1].to_radians();
	let lat2 = b[1].to_radians();
	let d_lat = (b[1] - a[1]).to_radians();
	let d_lon = (b[0] - a[0]).to_radians();
	let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
	2.0 * EARTH_RADIUS * h.sqrt().min(1.0).asin()
}

/// Position on the unit sphere for `[lon, lat]` in degrees.
///
/// Straight-line (chord) distance between two such vectors grows monotonically with
/// their great-circle distance, so a euclidean nearest neighbour search on these
/// vectors visits points in haversine order.
#[must_use]
pub fn unit_vector(position: [f64; 2]) -> [f64; 3] {
	let lon = position[0].to_radians();
	let lat = position[1].to_radians();
	[lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

/// Converts a chord length on the unit sphere into a great-circle distance in meters.
#[must_use]
pub fn chord_to_meters(chord: f64) -> f64 {
	2.0 * EARTH_RADIUS * (chord / 2.0).min(1.0).asin()
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	#[test]
	fn haversine() {
		let d = haversine_distance([-75.343, 39.984], [-75.534, 39.123]);
		assert_abs_diff_eq!(d, 97_129.22, epsilon = 0.01);
		assert_eq!(haversine_distance([10.0, 20.0], [10.0, 20.0]), 0.0);
	}

	#[test]
	fn antipodes() {
		let d = haversine_distance([0.0, 0.0], [180.0, 0.0]);
		assert_abs_diff_eq!(d, std::f64::consts::PI * EARTH_RADIUS, epsilon = 1e-6);
	}

	#[test]
	fn chord_matches_haversine() {
		let a = [13.4, 52.5];
		let b = [2.35, 48.85];
		let [x1, y1, z1] = unit_vector(a);
		let [x2, y2, z2] = unit_vector(b);
		let chord = ((x1 - x2).powi(2) + (y1 - y2).powi(2) + (z1 - z2).powi(2)).sqrt();
		assert_abs_diff_eq!(chord_to_meters(chord), haversine_distance(a, b), epsilon = 1e-3);
	}
}
