
use nalgebra::Vector3;

use crate::SimError;
use crate::gnss::constants::{OMEGA_EARTH, R2D, SPEED_OF_LIGHT};
use crate::gnss::time::GpsTime;
use crate::utils::kinematics::{self, AzEl};

pub mod ephemeris;
pub mod ionosphere;

use self::ephemeris::Ephemeris;
use self::ionosphere::IonoUtc;

/// Observables between one satellite and the receiver at a reception time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeObservation {
	pub g:GpsTime,
	pub range:f64,          // [m] pseudorange including ionospheric delay
	pub rate:f64,           // [m/s]
	pub d:f64,              // [m] geometric distance
	pub azel:AzEl,
	pub iono_delay:f64,     // [m]
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visibility {
	Invalid,
	Hidden(AzEl),
	Visible(AzEl),
}

/// Range from the receiver at `xyz` to the satellite, for a signal received at `g`
pub fn compute_range(eph:&Ephemeris, iono:&IonoUtc, g:&GpsTime, xyz:&Vector3<f64>) -> Result<RangeObservation, SimError> {
	let st = eph.position_velocity_clock(g)?;

	// Light time, then move the satellite back to where it was when it transmitted
	let tau:f64 = (st.pos - xyz).norm() / SPEED_OF_LIGHT;
	let mut pos:Vector3<f64> = st.pos - st.vel*tau;

	// Earth rotation during the light time; the change in velocity is negligible
	let xrot:f64 = pos[0] + pos[1]*OMEGA_EARTH*tau;
	let yrot:f64 = pos[1] - pos[0]*OMEGA_EARTH*tau;
	pos[0] = xrot;
	pos[1] = yrot;

	let los:Vector3<f64> = pos - xyz;
	let d:f64 = los.norm();
	let rate:f64 = st.vel.dot(&los) / d;

	let llh = kinematics::ecef_to_wgs84(xyz);
	let tmat = kinematics::ltcmat(&llh);
	let azel = kinematics::neu_to_azel(&kinematics::ecef_to_neu(&los, &tmat));

	let iono_delay:f64 = iono.delay(g, &llh, &azel);

	Ok(RangeObservation{ g:*g, range: d - SPEED_OF_LIGHT*st.clk[0] + iono_delay, rate, d, azel, iono_delay })
}

/// Elevation test without light-time correction; a satellite exactly on the mask is hidden
pub fn check_visibility(eph:&Ephemeris, g:&GpsTime, xyz:&Vector3<f64>, elv_mask_deg:f64) -> Result<Visibility, SimError> {
	if !eph.valid { return Ok(Visibility::Invalid); }

	let st = eph.position_velocity_clock(g)?;
	let azel = kinematics::azel_from(xyz, &st.pos);

	if azel.el*R2D > elv_mask_deg { Ok(Visibility::Visible(azel)) }
	else                          { Ok(Visibility::Hidden(azel))  }
}

#[cfg(test)]
mod tests {
	use super::*;
	use super::ephemeris::tests::sample_ephemeris;
	use super::ionosphere::tests::sample_iono;
	use crate::utils::kinematics::PositionWGS84;

	// Sub-satellite point of the sample orbit at the reference epoch, lifted off the ground
	fn receiver_under(eph:&Ephemeris, g:&GpsTime) -> Vector3<f64> {
		let st = eph.position_velocity_clock(g).unwrap();
		let llh = kinematics::ecef_to_wgs84(&st.pos);
		kinematics::wgs84_to_ecef(&PositionWGS84{ height_above_ellipsoid: 100.0, ..llh })
	}

	#[test]
	fn pseudorange_reference_values() {
		let eph = sample_ephemeris();
		let iono = IonoUtc{ enable: false, ..sample_iono() };
		let g = GpsTime::new(2000, 0.0);
		let xyz = receiver_under(&eph, &g);

		let rho = compute_range(&eph, &iono, &g, &xyz).unwrap();

		// Independent light-time solution: iterate the transmit time to convergence
		let mut tau:f64 = 0.07;
		let mut d:f64 = 0.0;
		for _ in 0..5 {
			let st = eph.position_velocity_clock(&g.inc(0.0)).unwrap();
			let p = st.pos - st.vel*tau;
			let theta = OMEGA_EARTH*tau;
			let p_rot = Vector3::new(p[0]*theta.cos() + p[1]*theta.sin(), p[1]*theta.cos() - p[0]*theta.sin(), p[2]);
			d = (p_rot - xyz).norm();
			tau = d / SPEED_OF_LIGHT;
		}
		assert!((rho.d - d).abs() < 1.0, "{} vs {}", rho.d, d);

		let clk = eph.position_velocity_clock(&g).unwrap().clk[0];
		assert!((rho.range - (rho.d - SPEED_OF_LIGHT*clk)).abs() < 1.0e-6);
		assert!(rho.azel.el > 1.5);
		assert_eq!(rho.iono_delay, 0.0);
	}

	#[test]
	fn iono_delay_is_added_to_pseudorange() {
		let eph = sample_ephemeris();
		let g = GpsTime::new(2000, 0.0);
		let xyz = receiver_under(&eph, &g);

		let without = compute_range(&eph, &IonoUtc{ enable: false, ..sample_iono() }, &g, &xyz).unwrap();
		let with = compute_range(&eph, &sample_iono(), &g, &xyz).unwrap();
		assert!(with.iono_delay > 1.0 && with.iono_delay < 50.0);
		assert!((with.range - without.range - with.iono_delay).abs() < 1.0e-6);
	}

	#[test]
	fn visibility() {
		let eph = sample_ephemeris();
		let g = GpsTime::new(2000, 0.0);
		let xyz = receiver_under(&eph, &g);

		match check_visibility(&eph, &g, &xyz, 10.0).unwrap() {
			Visibility::Visible(azel) => assert!(azel.el*R2D > 80.0),
			other => panic!("expected visible, got {:?}", other),
		}

		// Opposite side of the earth
		match check_visibility(&eph, &g, &(-xyz), 0.0).unwrap() {
			Visibility::Hidden(azel) => assert!(azel.el < 0.0),
			other => panic!("expected hidden, got {:?}", other),
		}

		let invalid = Ephemeris{ valid: false, ..eph };
		assert_eq!(check_visibility(&invalid, &g, &xyz, 0.0).unwrap(), Visibility::Invalid);
	}

	#[test]
	fn satellite_on_the_mask_is_hidden() {
		let eph = sample_ephemeris();
		let g = GpsTime::new(2000, 0.0);
		let xyz = receiver_under(&eph, &g);
		let el_deg = match check_visibility(&eph, &g, &xyz, 0.0).unwrap() {
			Visibility::Visible(azel) => azel.el*R2D,
			other => panic!("expected visible, got {:?}", other),
		};
		assert!(matches!(check_visibility(&eph, &g, &xyz, el_deg).unwrap(), Visibility::Hidden(_)));
	}
}
