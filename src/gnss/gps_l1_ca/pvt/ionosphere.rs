
use serde::{Serialize, Deserialize};

use crate::gnss::constants::{PI, SECONDS_IN_DAY, SPEED_OF_LIGHT};
use crate::gnss::time::GpsTime;
use crate::utils::kinematics::{AzEl, PositionWGS84};

/// Klobuchar coefficients and UTC parameters as broadcast on subframe 4, page 18
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IonoUtc {
	pub enable:bool,
	pub valid:bool,
	pub alpha0:f64, pub alpha1:f64, pub alpha2:f64, pub alpha3:f64,
	pub beta0:f64,  pub beta1:f64,  pub beta2:f64,  pub beta3:f64,
	pub a0:f64,     pub a1:f64,
	pub dtls:i32,   pub tot:i32,    pub wnt:i32,
	// Leap second schedule: week and day it takes effect, and the count afterwards
	pub wnlsf:i32,  pub dn:i32,     pub dtlsf:i32,
}

impl Default for IonoUtc {
	fn default() -> Self {
		Self{ enable: true, valid: false,
			alpha0: 0.0, alpha1: 0.0, alpha2: 0.0, alpha3: 0.0,
			beta0: 0.0, beta1: 0.0, beta2: 0.0, beta3: 0.0,
			a0: 0.0, a1: 0.0, dtls: 0, tot: 0, wnt: 0,
			// End of 2016, the most recent scheduled leap second
			wnlsf: 1929, dn: 7, dtlsf: 18 }
	}
}

impl IonoUtc {

	/// Single-frequency ionospheric delay in meters for a signal arriving at `llh` from `azel`
	pub fn delay(&self, g:&GpsTime, llh:&PositionWGS84, azel:&AzEl) -> f64 {
		if !self.enable { return 0.0; }

		// Algorithm from IS-GPS-200, Figure 20-4; angles below are in semicircles
		let el:f64 = azel.el / PI;
		let phi_u:f64 = llh.latitude / PI;
		let lam_u:f64 = llh.longitude / PI;

		let f_iono:f64 = 1.0 + 16.0*(0.53 - el).powi(3);       // obliquity factor

		if !self.valid {
			return f_iono * 5.0e-9 * SPEED_OF_LIGHT;
		}

		let psi:f64 = (0.0137/(el + 0.11)) - 0.022;
		let phi_i:f64 = {
			let ans = phi_u + psi*azel.az.cos();
			if      ans < -0.416 { -0.416 }
			else if ans >  0.416 {  0.416 }
			else                 {  ans   }
		};
		let lam_i:f64 = lam_u + (psi*azel.az.sin()) / (phi_i*PI).cos();

		// Geomagnetic latitude at the ionospheric pierce point
		let phi_m:f64 = phi_i + 0.064*((lam_i - 1.617)*PI).cos();
		let phi_m2:f64 = phi_m*phi_m;
		let phi_m3:f64 = phi_m2*phi_m;

		let amp:f64 = {
			let ans = self.alpha0 + self.alpha1*phi_m + self.alpha2*phi_m2 + self.alpha3*phi_m3;
			if ans < 0.0 { 0.0 } else { ans }
		};
		let per:f64 = {
			let ans = self.beta0 + self.beta1*phi_m + self.beta2*phi_m2 + self.beta3*phi_m3;
			if ans < 72000.0 { 72000.0 } else { ans }
		};

		let mut t:f64 = (SECONDS_IN_DAY/2.0)*lam_i + g.sec;      // [sec] local time
		while t >= SECONDS_IN_DAY { t -= SECONDS_IN_DAY; }
		while t < 0.0             { t += SECONDS_IN_DAY; }

		let x:f64 = 2.0*PI*(t - 50400.0) / per;                   // [rad]

		if x.abs() < 1.57 {
			let x2 = x*x;
			let x4 = x2*x2;
			f_iono * (5.0e-9 + amp*(1.0 - x2/2.0 + x4/24.0)) * SPEED_OF_LIGHT
		} else {
			f_iono * 5.0e-9 * SPEED_OF_LIGHT
		}
	}

}
