
use nalgebra::Vector3;
use serde::{Serialize, Deserialize};

use crate::SimError;
use crate::gnss::constants::{GM_EARTH, OMEGA_EARTH, SECONDS_IN_HALF_WEEK, SECONDS_IN_WEEK};
use crate::gnss::time::GpsTime;

pub const F:f64 = -4.442807633e-10;          // [sec/root-meter]

// Newton's method normally settles in under 10 steps for GPS eccentricities
pub const MAX_KEPLER_ITERATIONS:usize = 50;
const KEPLER_TOLERANCE:f64 = 1.0e-14;        // [rad]

/// Broadcast ephemeris for one satellite, angles in radians as they appear in RINEX files
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default)]
pub struct Ephemeris {
	pub valid:bool,
	pub toc:GpsTime,     pub toe:GpsTime,
	pub iodc:i32,        pub iode:i32,
	pub a_f0:f64,        pub a_f1:f64,      pub a_f2:f64,     pub t_gd:f64,
	pub sqrt_a:f64,      pub e:f64,         pub dn:f64,       pub m0:f64,
	pub omega0:f64,      pub omega:f64,     pub omega_dot:f64,
	pub i0:f64,          pub idot:f64,
	pub cus:f64,         pub cuc:f64,       pub crs:f64,      pub crc:f64,
	pub cis:f64,         pub cic:f64,
	pub sv_health:i32,   pub code_on_l2:i32,

	// Working values derived from the broadcast ones
	#[serde(default)] pub a:f64,
	#[serde(default)] pub n:f64,
	#[serde(default)] pub sq1e2:f64,
	#[serde(default)] pub omgkdot:f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SatState {
	pub pos:Vector3<f64>,      // [m] ECEF
	pub vel:Vector3<f64>,      // [m/s] ECEF
	pub clk:[f64; 2],          // [s], [s/s] bias and drift
}

/// Wraps a time difference into half a week either side of zero
pub fn wrap_half_week(mut tk:f64) -> f64 {
	if tk > SECONDS_IN_HALF_WEEK       { tk -= SECONDS_IN_WEEK; }
	else if tk < -SECONDS_IN_HALF_WEEK { tk += SECONDS_IN_WEEK; }
	tk
}

/// Solves `M = E - e*sin(E)` for the eccentric anomaly, returning it with the iteration count
pub fn solve_kepler(mk:f64, e:f64) -> Result<(f64, usize), SimError> {
	let mut ek:f64 = mk;
	let mut ekold:f64 = ek + 1.0;

	let mut iterations:usize = 0;
	while (ek - ekold).abs() > KEPLER_TOLERANCE {
		if iterations >= MAX_KEPLER_ITERATIONS { return Err(SimError::KeplerDivergence); }
		ekold = ek;
		ek += (mk - ekold + e*ekold.sin()) / (1.0 - e*ekold.cos());
		iterations += 1;
	}

	Ok((ek, iterations))
}

impl Ephemeris {

	pub fn update_working_values(&mut self) {
		self.a = self.sqrt_a * self.sqrt_a;
		self.n = (GM_EARTH / (self.a * self.a * self.a)).sqrt() + self.dn;
		self.sq1e2 = (1.0 - self.e*self.e).sqrt();
		self.omgkdot = self.omega_dot - OMEGA_EARTH;
	}

	/// Satellite position, velocity, and clock correction at `g`
	pub fn position_velocity_clock(&self, g:&GpsTime) -> Result<SatState, SimError> {
		let tk:f64 = wrap_half_week(g.sec - self.toe.sec);

		let mk:f64 = self.m0 + self.n*tk;
		let (ek, _) = solve_kepler(mk, self.e)?;
		let (sek, cek) = ek.sin_cos();
		let one_minus_ecos_e:f64 = 1.0 - self.e*cek;

		let ekdot:f64 = self.n / one_minus_ecos_e;

		let relativistic:f64 = F * self.e * self.sqrt_a * sek;

		// Argument of latitude and its second harmonic corrections
		let pk:f64 = (self.sq1e2*sek).atan2(cek - self.e) + self.omega;
		let pkdot:f64 = self.sq1e2 * ekdot / one_minus_ecos_e;

		let (s2pk, c2pk) = (2.0*pk).sin_cos();

		let uk:f64 = pk + self.cus*s2pk + self.cuc*c2pk;
		let (suk, cuk) = uk.sin_cos();
		let ukdot:f64 = pkdot * (1.0 + 2.0*(self.cus*c2pk - self.cuc*s2pk));

		let rk:f64 = self.a*one_minus_ecos_e + self.crc*c2pk + self.crs*s2pk;
		let rkdot:f64 = self.a*self.e*sek*ekdot + 2.0*pkdot*(self.crs*c2pk - self.crc*s2pk);

		let ik:f64 = self.i0 + self.idot*tk + self.cic*c2pk + self.cis*s2pk;
		let (sik, cik) = ik.sin_cos();
		let ikdot:f64 = self.idot + 2.0*pkdot*(self.cis*c2pk - self.cic*s2pk);

		// Position in the orbital plane
		let xpk:f64 = rk*cuk;
		let ypk:f64 = rk*suk;
		let xpkdot:f64 = rkdot*cuk - ypk*ukdot;
		let ypkdot:f64 = rkdot*suk + xpk*ukdot;

		let ok:f64 = self.omega0 + tk*self.omgkdot - OMEGA_EARTH*self.toe.sec;
		let (sok, cok) = ok.sin_cos();

		let pos = Vector3::new(xpk*cok - ypk*cik*sok, xpk*sok + ypk*cik*cok, ypk*sik);

		let tmp:f64 = ypkdot*cik - ypk*sik*ikdot;
		let vel = Vector3::new(
			-self.omgkdot*pos[1] + xpkdot*cok - tmp*sok,
			 self.omgkdot*pos[0] + xpkdot*sok + tmp*cok,
			 ypk*cik*ikdot + ypkdot*sik);

		let tc:f64 = wrap_half_week(g.sec - self.toc.sec);
		let clk = [
			self.a_f0 + tc*(self.a_f1 + tc*self.a_f2) + relativistic - self.t_gd,
			self.a_f1 + 2.0*tc*self.a_f2,
		];

		Ok(SatState{ pos, vel, clk })
	}

	/// Shifts both reference epochs by `dsec` seconds
	pub fn shift_epochs(&mut self, dsec:f64) {
		self.toc = self.toc.inc(dsec);
		self.toe = self.toe.inc(dsec);
	}

}
