#![allow(non_snake_case)]

/*	GPS L1 C/A navigation message encoding:
	- Subframe packing from ephemeris and iono/UTC parameters
	- Per-word parity, chained through the last two bits of the previous word
	- Frame sequencing with time-of-week tagging
*/

pub mod subframe;
pub mod frame;

pub const N_SBF:usize = 5;                        // subframes per frame
pub const N_DWRD_SBF:usize = 10;                  // words per subframe
pub const N_DWRD:usize = (N_SBF + 1)*N_DWRD_SBF;  // the previous subframe 5 followed by one frame

// Source bits d1..d24 (word bits 29..6) feeding each of D25..D30
const PARITY_MASKS:[u32; 6] = [0x3B1F3480, 0x1D8F9A40, 0x2EC7CD00, 0x1763E680, 0x2BB1F340, 0x0B7A89C0];

const DATA_MASK:u32 = 0x3FFFFFC0;

fn parity_bit(prev:u32, mask:u32, d:u32) -> u32 { (prev + (mask & d).count_ones()) % 2 }

/// Appends parity to a navigation word.
///
/// Input layout: bits 31..30 hold D29* and D30* of the previous transmitted word, bits 29..6 hold
/// the source data d1..d24, bits 5..0 are ignored. Output layout: bits 29..6 hold D1..D24 (the data,
/// complemented when D30* is set) and bits 5..0 hold D25..D30; bits 31..30 are cleared.
///
/// Words 2 and 10 carry non-information bits in positions 23 and 24 (word bits 7 and 6). With `nib`
/// set those two bits are solved so that D29 and D30 come out zero.
pub fn compute_checksum(source:u32, nib:bool) -> u32 {
	let mut d:u32 = source & DATA_MASK;
	let D29:u32 = (source >> 31) & 0x1;
	let D30:u32 = (source >> 30) & 0x1;

	if nib {
		if parity_bit(D30, PARITY_MASKS[4], d) == 1 { d ^= 0x1 << 6; }
		if parity_bit(D29, PARITY_MASKS[5], d) == 1 { d ^= 0x1 << 7; }
	}

	let mut D:u32 = d;
	if D30 == 1 { D ^= DATA_MASK; }

	D |= parity_bit(D29, PARITY_MASKS[0], d) << 5;
	D |= parity_bit(D30, PARITY_MASKS[1], d) << 4;
	D |= parity_bit(D29, PARITY_MASKS[2], d) << 3;
	D |= parity_bit(D30, PARITY_MASKS[3], d) << 2;
	D |= parity_bit(D30, PARITY_MASKS[4], d) << 1;
	D |= parity_bit(D29, PARITY_MASKS[5], d);

	D & 0x3FFFFFFF
}

/// Receiver-side check of one transmitted 30-bit word, IS-GPS-200 Table 20-XIV
pub fn parity_check(word:u32, last_D29:bool, last_D30:bool) -> bool {
	// d[0] is d1, taken from word bit 29
	let mut d:[bool; 24] = [false; 24];
	for (i, b) in d.iter_mut().enumerate() {
		*b = ((word >> (29 - i)) & 0x1 == 1) ^ last_D30;
	}

	let parity:[bool; 6] = [
		last_D29 ^ d[0] ^ d[1] ^ d[2] ^ d[4] ^ d[5] ^ d[9]  ^ d[10] ^ d[11] ^ d[12] ^ d[13] ^ d[16] ^ d[17] ^ d[19] ^ d[22],
		last_D30 ^ d[1] ^ d[2] ^ d[3] ^ d[5] ^ d[6] ^ d[10] ^ d[11] ^ d[12] ^ d[13] ^ d[14] ^ d[17] ^ d[18] ^ d[20] ^ d[23],
		last_D29 ^ d[0] ^ d[2] ^ d[3] ^ d[4] ^ d[6] ^ d[7]  ^ d[11] ^ d[12] ^ d[13] ^ d[14] ^ d[15] ^ d[18] ^ d[19] ^ d[21],
		last_D30 ^ d[1] ^ d[3] ^ d[4] ^ d[5] ^ d[7] ^ d[8]  ^ d[12] ^ d[13] ^ d[14] ^ d[15] ^ d[16] ^ d[19] ^ d[20] ^ d[22],
		last_D30 ^ d[0] ^ d[2] ^ d[4] ^ d[5] ^ d[6] ^ d[8]  ^ d[9]  ^ d[13] ^ d[14] ^ d[15] ^ d[16] ^ d[17] ^ d[20] ^ d[21] ^ d[23],
		last_D29 ^ d[2] ^ d[4] ^ d[5] ^ d[7] ^ d[8] ^ d[9]  ^ d[10] ^ d[12] ^ d[14] ^ d[18] ^ d[21] ^ d[22] ^ d[23],
	];

	parity.iter().enumerate().all(|(i, p)| ((word >> (5 - i)) & 0x1 == 1) == *p)
}

/// Checks a run of transmitted words, chaining D29*/D30* from each word into the next
pub fn check_words(words:&[u32], mut last:u32) -> bool {
	for &w in words {
		if !parity_check(w, (last >> 1) & 0x1 == 1, last & 0x1 == 1) { return false; }
		last = w;
	}
	true
}

#[cfg(test)]
mod tests {
	use rand::Rng;
	use super::*;

	#[test]
	fn checksum_satisfies_parity_equations() {
		let mut rng = rand::thread_rng();
		for _ in 0..5000 {
			let data:u32 = rng.gen::<u32>() & DATA_MASK;
			let prev:u32 = rng.gen_range(0..4);
			let nib:bool = rng.gen();

			let word = compute_checksum(data | (prev << 30), nib);
			assert_eq!(word >> 30, 0);
			assert!(parity_check(word, prev & 0x2 != 0, prev & 0x1 != 0), "data={:08x} prev={} nib={}", data, prev, nib);

			// Information bits come through untouched apart from the D30* complement
			let recovered = if prev & 0x1 == 1 { (word ^ DATA_MASK) & DATA_MASK } else { word & DATA_MASK };
			let kept:u32 = if nib { DATA_MASK & !0xC0 } else { DATA_MASK };
			assert_eq!(recovered & kept, data & kept);

			if nib { assert_eq!(word & 0x3, 0); }
		}
	}

	#[test]
	fn known_tlm_word() {
		// Preamble 10001011 followed by zeros, previous word ending in 00
		let word = compute_checksum(0x8B0000 << 6, false);
		assert_eq!(word >> 6, 0x8B0000);
		assert!(parity_check(word, false, false));
	}

	#[test]
	fn corrupted_word_fails() {
		let word = compute_checksum(0x12345678 & DATA_MASK, false);
		for bit in 0..30 {
			assert!(!parity_check(word ^ (1 << bit), false, false));
		}
	}
}
