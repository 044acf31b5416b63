
use crate::gnss::constants::{CA_SEQ_LEN, MAX_SAT};

// G2 output delay in chips for PRN 1 through 32, IS-GPS-200 Table 3-Ia
const G2_DELAY:[usize; MAX_SAT] = [
	  5,   6,   7,   8,  17,  18, 139, 140, 141, 251,
	252, 254, 255, 256, 257, 258, 469, 470, 471, 472,
	473, 474, 509, 512, 513, 514, 515, 516, 859, 860,
	861, 862];

/// The 1023-chip C/A code for `prn` as 0/1 chips, or `None` outside PRN 1-32
pub fn ca_code(prn:usize) -> Option<[i8; CA_SEQ_LEN]> {
	if prn < 1 || prn > MAX_SAT { return None; }

	// Both registers run in the +1/-1 domain, where XOR becomes multiplication
	let mut r1:[i8; 10] = [-1; 10];
	let mut r2:[i8; 10] = [-1; 10];
	let mut g1:[i8; CA_SEQ_LEN] = [0; CA_SEQ_LEN];
	let mut g2:[i8; CA_SEQ_LEN] = [0; CA_SEQ_LEN];

	for i in 0..CA_SEQ_LEN {
		g1[i] = r1[9];
		g2[i] = r2[9];
		let c1:i8 = r1[2]*r1[9];
		let c2:i8 = r2[1]*r2[2]*r2[5]*r2[7]*r2[8]*r2[9];

		for j in (1..10).rev() {
			r1[j] = r1[j-1];
			r2[j] = r2[j-1];
		}
		r1[0] = c1;
		r2[0] = c2;
	}

	let delay:usize = G2_DELAY[prn-1];
	let mut ca:[i8; CA_SEQ_LEN] = [0; CA_SEQ_LEN];
	for i in 0..CA_SEQ_LEN {
		ca[i] = (1 - g1[i]*g2[(i + CA_SEQ_LEN - delay) % CA_SEQ_LEN]) / 2;
	}

	Some(ca)
}
