
use crate::gnss::constants::PI;
use crate::gnss::gps_l1_ca::pvt::ephemeris::Ephemeris;
use crate::gnss::gps_l1_ca::pvt::ionosphere::IonoUtc;

use super::{N_DWRD_SBF, N_SBF};

pub type Subframes = [[u32; N_DWRD_SBF]; N_SBF];

const PREAMBLE:u32 = 0x8B0000 << 6;
const DATA_ID:u32 = 1;
const SBF4_PAGE18_SV_ID:u32 = 56;
const SBF4_PAGE25_SV_ID:u32 = 63;
const SBF5_PAGE25_SV_ID:u32 = 51;

fn pow2(n:i32) -> f64 { 2.0_f64.powi(n) }

// Word contents with zero TOW and week, before parity; two low bits of every field are left clear
fn how(subframe_id:u32) -> u32 { subframe_id << 8 }

fn bits(v:i64, mask:u32, shift:u32) -> u32 { ((v as u32) & mask) << shift }

/// Packs one satellite's ephemeris and the iono/UTC page into the five subframes.
///
/// Each word holds its 24 data bits in bits 29..6. The HOW time of week, the week number of
/// subframe 1, and the parity are filled in later by [`frame::NavMessage`](super::frame::NavMessage).
/// Subframe 1 is packed with a transmission week number of 0; the actual week is never written
/// into that field here.
pub fn eph2sbf(eph:&Ephemeris, iono:&IonoUtc) -> Subframes {
	let wn:i64 = 0;
	let toe:i64 = (eph.toe.sec / 16.0) as i64;
	let toc:i64 = (eph.toc.sec / 16.0) as i64;
	let iode:i64 = eph.iode as i64;
	let iodc:i64 = eph.iodc as i64;
	let deltan:i64 = (eph.dn / pow2(-43) / PI) as i64;
	let cuc:i64 = (eph.cuc / pow2(-29)) as i64;
	let cus:i64 = (eph.cus / pow2(-29)) as i64;
	let cic:i64 = (eph.cic / pow2(-29)) as i64;
	let cis:i64 = (eph.cis / pow2(-29)) as i64;
	let crc:i64 = (eph.crc / pow2(-5)) as i64;
	let crs:i64 = (eph.crs / pow2(-5)) as i64;
	let ecc:i64 = (eph.e / pow2(-33)) as i64;
	let sqrta:i64 = (eph.sqrt_a / pow2(-19)) as i64;
	let m0:i64 = (eph.m0 / pow2(-31) / PI) as i64;
	let omg0:i64 = (eph.omega0 / pow2(-31) / PI) as i64;
	let inc0:i64 = (eph.i0 / pow2(-31) / PI) as i64;
	let aop:i64 = (eph.omega / pow2(-31) / PI) as i64;
	let omgdot:i64 = (eph.omega_dot / pow2(-43) / PI) as i64;
	let idot:i64 = (eph.idot / pow2(-43) / PI) as i64;
	let af0:i64 = (eph.a_f0 / pow2(-31)) as i64;
	let af1:i64 = (eph.a_f1 / pow2(-43)) as i64;
	let af2:i64 = (eph.a_f2 / pow2(-55)) as i64;
	let tgd:i64 = (eph.t_gd / pow2(-31)) as i64;
	let svhlth:i64 = eph.sv_health as i64;
	let code_l2:i64 = eph.code_on_l2 as i64;
	let ura:i64 = 0;

	let wna:i64 = (eph.toe.week % 256) as i64;
	let toa:i64 = (eph.toe.sec / 4096.0) as i64;

	let alpha0:i64 = (iono.alpha0 / pow2(-30)).round() as i64;
	let alpha1:i64 = (iono.alpha1 / pow2(-27)).round() as i64;
	let alpha2:i64 = (iono.alpha2 / pow2(-24)).round() as i64;
	let alpha3:i64 = (iono.alpha3 / pow2(-24)).round() as i64;
	let beta0:i64 = (iono.beta0 / 2048.0).round() as i64;
	let beta1:i64 = (iono.beta1 / 16384.0).round() as i64;
	let beta2:i64 = (iono.beta2 / 65536.0).round() as i64;
	let beta3:i64 = (iono.beta3 / 65536.0).round() as i64;
	let a0:i64 = (iono.a0 / pow2(-30)).round() as i64;
	let a1:i64 = (iono.a1 / pow2(-50)).round() as i64;
	let dtls:i64 = iono.dtls as i64;
	let tot:i64 = (iono.tot / 4096) as i64;
	let wnt:i64 = (iono.wnt % 256) as i64;
	let wnlsf:i64 = (iono.wnlsf % 256) as i64;
	let dn:i64 = iono.dn as i64;
	let dtlsf:i64 = iono.dtlsf as i64;

	let mut sbf:Subframes = [[0; N_DWRD_SBF]; N_SBF];

	// Subframe 1: clock
	sbf[0][0] = PREAMBLE;
	sbf[0][1] = how(1);
	sbf[0][2] = bits(wn, 0x3FF, 20) | bits(code_l2, 0x3, 18) | bits(ura, 0xF, 14) | bits(svhlth, 0x3F, 8) | bits(iodc >> 8, 0x3, 6);
	sbf[0][6] = bits(tgd, 0xFF, 6);
	sbf[0][7] = bits(iodc, 0xFF, 22) | bits(toc, 0xFFFF, 6);
	sbf[0][8] = bits(af2, 0xFF, 22) | bits(af1, 0xFFFF, 6);
	sbf[0][9] = bits(af0, 0x3FFFFF, 8);

	// Subframe 2: ephemeris part 1
	sbf[1][0] = PREAMBLE;
	sbf[1][1] = how(2);
	sbf[1][2] = bits(iode, 0xFF, 22) | bits(crs, 0xFFFF, 6);
	sbf[1][3] = bits(deltan, 0xFFFF, 14) | bits(m0 >> 24, 0xFF, 6);
	sbf[1][4] = bits(m0, 0xFFFFFF, 6);
	sbf[1][5] = bits(cuc, 0xFFFF, 14) | bits(ecc >> 24, 0xFF, 6);
	sbf[1][6] = bits(ecc, 0xFFFFFF, 6);
	sbf[1][7] = bits(cus, 0xFFFF, 14) | bits(sqrta >> 24, 0xFF, 6);
	sbf[1][8] = bits(sqrta, 0xFFFFFF, 6);
	sbf[1][9] = bits(toe, 0xFFFF, 14);

	// Subframe 3: ephemeris part 2
	sbf[2][0] = PREAMBLE;
	sbf[2][1] = how(3);
	sbf[2][2] = bits(cic, 0xFFFF, 14) | bits(omg0 >> 24, 0xFF, 6);
	sbf[2][3] = bits(omg0, 0xFFFFFF, 6);
	sbf[2][4] = bits(cis, 0xFFFF, 14) | bits(inc0 >> 24, 0xFF, 6);
	sbf[2][5] = bits(inc0, 0xFFFFFF, 6);
	sbf[2][6] = bits(crc, 0xFFFF, 14) | bits(aop >> 24, 0xFF, 6);
	sbf[2][7] = bits(aop, 0xFFFFFF, 6);
	sbf[2][8] = bits(omgdot, 0xFFFFFF, 6);
	sbf[2][9] = bits(iode, 0xFF, 22) | bits(idot, 0x3FFF, 8);

	// Subframe 4: page 18 when the iono/UTC set is complete, otherwise the dummy page 25
	sbf[3][0] = PREAMBLE;
	sbf[3][1] = how(4);
	if iono.valid {
		sbf[3][2] = (DATA_ID << 28) | (SBF4_PAGE18_SV_ID << 22) | bits(alpha0, 0xFF, 14) | bits(alpha1, 0xFF, 6);
		sbf[3][3] = bits(alpha2, 0xFF, 22) | bits(alpha3, 0xFF, 14) | bits(beta0, 0xFF, 6);
		sbf[3][4] = bits(beta1, 0xFF, 22) | bits(beta2, 0xFF, 14) | bits(beta3, 0xFF, 6);
		sbf[3][5] = bits(a1, 0xFFFFFF, 6);
		sbf[3][6] = bits(a0 >> 8, 0xFFFFFF, 6);
		sbf[3][7] = bits(a0, 0xFF, 22) | bits(tot, 0xFF, 14) | bits(wnt, 0xFF, 6);
		sbf[3][8] = bits(dtls, 0xFF, 22) | bits(wnlsf, 0xFF, 14) | bits(dn, 0xFF, 6);
		sbf[3][9] = bits(dtlsf, 0xFF, 22);
	} else {
		sbf[3][2] = (DATA_ID << 28) | (SBF4_PAGE25_SV_ID << 22);
	}

	// Subframe 5: page 25, almanac reference time only
	sbf[4][0] = PREAMBLE;
	sbf[4][1] = how(5);
	sbf[4][2] = (DATA_ID << 28) | (SBF5_PAGE25_SV_ID << 22) | bits(toa, 0xFF, 14) | bits(wna, 0xFF, 6);

	sbf
}
