
use nalgebra::{Matrix3, Vector3};
use serde::{Serialize, Deserialize};

use crate::gnss::constants::PI;

pub const WGS84_SEMI_MAJOR_AXIS_METERS:f64 = 6378137.0;
pub const WGS84_ECCENTRICITY:f64 = 0.0818191908426;

const EPS:f64 = 1.0e-3;           // [m]
const MAX_ITER:usize = 100;

/// Geodetic position; latitude and longitude in radians, height in meters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionWGS84 {
	pub latitude:f64,
	pub longitude:f64,
	pub height_above_ellipsoid:f64,
}

/// Azimuth in [0, 2pi) measured from north through east, elevation in [-pi/2, pi/2]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AzEl {
	pub az:f64,
	pub el:f64,
}

impl PositionWGS84 {
	pub fn from_degrees(lat_deg:f64, lon_deg:f64, height:f64) -> Self {
		Self{ latitude: lat_deg.to_radians(), longitude: lon_deg.to_radians(), height_above_ellipsoid: height }
	}
}

pub fn ecef_to_wgs84(xyz:&Vector3<f64>) -> PositionWGS84 {
	let a:f64 = WGS84_SEMI_MAJOR_AXIS_METERS;
	let e2:f64 = WGS84_ECCENTRICITY * WGS84_ECCENTRICITY;

	// The center of the earth has no defined latitude or longitude
	if xyz.norm() < EPS {
		return PositionWGS84{ latitude: 0.0, longitude: 0.0, height_above_ellipsoid: -a };
	}

	let (x, y, z) = (xyz[0], xyz[1], xyz[2]);
	let rho2:f64 = x*x + y*y;

	let mut dz:f64 = e2*z;
	let mut zdz:f64 = z + dz;
	let mut nh:f64 = (rho2 + zdz*zdz).sqrt();
	let mut n:f64 = a;

	for _ in 0..MAX_ITER {
		zdz = z + dz;
		nh = (rho2 + zdz*zdz).sqrt();
		let slat:f64 = zdz / nh;
		n = a / (1.0 - e2*slat*slat).sqrt();
		let dz_new:f64 = n*e2*slat;

		if (dz - dz_new).abs() < EPS { break; }
		dz = dz_new;
	}

	PositionWGS84{
		latitude: zdz.atan2(rho2.sqrt()),
		longitude: y.atan2(x),
		height_above_ellipsoid: nh - n,
	}
}

pub fn wgs84_to_ecef(llh:&PositionWGS84) -> Vector3<f64> {
	let a:f64 = WGS84_SEMI_MAJOR_AXIS_METERS;
	let e:f64 = WGS84_ECCENTRICITY;
	let e2:f64 = e*e;

	let (slat, clat) = llh.latitude.sin_cos();
	let (slon, clon) = llh.longitude.sin_cos();
	let d:f64 = e*slat;

	let n:f64 = a / (1.0 - d*d).sqrt();
	let nph:f64 = n + llh.height_above_ellipsoid;

	let tmp:f64 = nph*clat;
	Vector3::new(tmp*clon, tmp*slon, ((1.0 - e2)*n + llh.height_above_ellipsoid)*slat)
}

/// Rotation from ECEF into the local north-east-up frame at `llh`
pub fn ltcmat(llh:&PositionWGS84) -> Matrix3<f64> {
	let (slat, clat) = llh.latitude.sin_cos();
	let (slon, clon) = llh.longitude.sin_cos();

	Matrix3::new(-slat*clon, -slat*slon, clat,
	             -slon,       clon,      0.0,
	              clat*clon,  clat*slon, slat)
}

pub fn ecef_to_neu(xyz:&Vector3<f64>, t:&Matrix3<f64>) -> Vector3<f64> { t * xyz }

pub fn neu_to_azel(neu:&Vector3<f64>) -> AzEl {
	let mut az:f64 = neu[1].atan2(neu[0]);
	if az < 0.0 { az += 2.0*PI; }

	let ne:f64 = (neu[0]*neu[0] + neu[1]*neu[1]).sqrt();
	AzEl{ az, el: neu[2].atan2(ne) }
}

/// Az/el of `target` as seen from `observer`, both in ECEF
pub fn azel_from(observer:&Vector3<f64>, target:&Vector3<f64>) -> AzEl {
	let tmat = ltcmat(&ecef_to_wgs84(observer));
	neu_to_azel(&ecef_to_neu(&(target - observer), &tmat))
}

#[cfg(test)]
mod tests {
	use rand::Rng;
	use super::*;

	#[test]
	fn llh_round_trip() {
		let mut rng = rand::thread_rng();
		for _ in 0..500 {
			let llh = PositionWGS84::from_degrees(rng.gen_range(-80.0..80.0), rng.gen_range(-180.0..180.0), rng.gen_range(-1000.0..10000.0));
			let back = ecef_to_wgs84(&wgs84_to_ecef(&llh));
			assert!((back.latitude - llh.latitude).abs() < 1.0e-6);
			assert!((back.longitude - llh.longitude).abs() < 1.0e-6);
			assert!((back.height_above_ellipsoid - llh.height_above_ellipsoid).abs() < 1.0e-3);
		}
	}

	#[test]
	fn earth_center_is_degenerate() {
		let llh = ecef_to_wgs84(&Vector3::new(0.0, 0.0, 0.0));
		assert_eq!(llh, PositionWGS84{ latitude: 0.0, longitude: 0.0, height_above_ellipsoid: -WGS84_SEMI_MAJOR_AXIS_METERS });
	}

	#[test]
	fn azimuth_and_elevation() {
		let obs = wgs84_to_ecef(&PositionWGS84::from_degrees(35.681298, 139.766247, 10.0));
		let up = wgs84_to_ecef(&PositionWGS84::from_degrees(35.681298, 139.766247, 20200e3));
		let azel = azel_from(&obs, &up);
		assert!((azel.el - PI/2.0).abs() < 1.0e-6);

		// Due north on the local horizon
		let tmat = ltcmat(&ecef_to_wgs84(&obs));
		let north = obs + tmat.transpose() * Vector3::new(1000.0, 0.0, 0.0);
		let azel = azel_from(&obs, &north);
		assert!(azel.az.abs() < 1.0e-6 || (azel.az - 2.0*PI).abs() < 1.0e-6);
		assert!(azel.el.abs() < 1.0e-3);

		// East gives 90 degrees; azimuth is never negative
		let east = obs + tmat.transpose() * Vector3::new(0.0, 1000.0, 0.0);
		assert!((azel_from(&obs, &east).az - PI/2.0).abs() < 1.0e-6);
		let west = obs + tmat.transpose() * Vector3::new(0.0, -1000.0, 0.0);
		assert!((azel_from(&obs, &west).az - 1.5*PI).abs() < 1.0e-6);
	}
}
