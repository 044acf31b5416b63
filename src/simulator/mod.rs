
use crate::SimError;
use crate::block::pipeline::StreamingPipeline;
use crate::config::SimConfig;
use crate::gnss::constants::SECONDS_IN_HOUR;
use crate::gnss::time::{DateTime, GpsTime};
use crate::gnss::gps_l1_ca::channel::allocation::{allocate_channels, SimulationState};
use crate::gnss::gps_l1_ca::pvt::ionosphere::IonoUtc;
use crate::gnss::gps_l1_ca::synthesis::{SampleSynthesizer, TICK_SEC};
use crate::gnss::gps_l1_ca::synthesis::nco::CarrierNco;
use crate::gnss::gps_l1_ca::telemetry_encode::subframe::eph2sbf;
use crate::io::{EphemerisData, ReceiverPosition};


const OVERRIDE_ALIGN_SEC:i64 = 7200;
const FRAME_TICKS:i64 = 300;         // 30 s of 100 ms ticks

/// Start time and ephemeris set chosen for a run, with the table already time-shifted
/// when the start time was overridden
#[derive(Debug, Clone)]
pub struct Scenario {
	pub data:EphemerisData,
	pub g0:GpsTime,
	pub ieph:usize,
	pub shift_sec:Option<f64>,
}

impl Scenario {

	/// Picks the start time, applying an epoch shift for `time_override`, and finds the
	/// ephemeris set within an hour of it
	pub fn resolve(data:EphemerisData, start:Option<DateTime>, time_override:bool) -> Result<Self, SimError> {
		let mut data = data.validated()?;

		let gmin = data.earliest().ok_or(SimError::NoEphemeris)?;
		let gmax = data.latest().ok_or(SimError::NoEphemeris)?;

		let mut shift_sec:Option<f64> = None;
		let g0 = match start {
			Some(t) => {
				let g0 = GpsTime::from_date(&t);
				if time_override {
					// Ephemerides move to the 2-hour boundary at or before the start time
					let gtmp = GpsTime::new(g0.week, (((g0.sec as i64) / OVERRIDE_ALIGN_SEC) * OVERRIDE_ALIGN_SEC) as f64);
					let dsec = gtmp.sub(&gmin);

					data.iono.wnt = gtmp.week;
					data.iono.tot = gtmp.sec as i32;
					data.shift_epochs(dsec);
					shift_sec = Some(dsec);
					info!("Ephemeris epochs shifted by {:.0} s", dsec);
				} else if g0.sub(&gmin) < 0.0 || gmax.sub(&g0) < 0.0 {
					return Err(SimError::InvalidStartTime(format!("{} is outside the ephemeris span {} to {}", t, gmin, gmax)));
				}
				g0
			},
			None => gmin,
		};

		let ieph = data.current_set(&g0).ok_or(SimError::NoCurrentEphemeris)?;
		debug!("Start {} uses ephemeris set {} of {}", g0, ieph, data.num_sets());

		Ok(Self{ data, g0, ieph, shift_sec })
	}

}

/// Totals for a finished run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
	pub blocks:usize,
	pub end:GpsTime,
	pub ieph:usize,
}

/// Drives the 100 ms tick loop: range update, one block through the pipeline, and a nav,
/// ephemeris and channel refresh on every 30 s boundary
pub struct Simulator {
	pub synth:SampleSynthesizer,
	pub scenario:Scenario,
	pub iono:IonoUtc,
	pub elevation_mask_deg:f64,
	pub max_blocks:Option<usize>,
}

impl Simulator {

	pub fn new(cfg:&SimConfig, scenario:Scenario) -> Result<Self, SimError> {
		let synth = SampleSynthesizer::new(cfg.sample_rate_hz())?;
		let iono = IonoUtc{ enable: cfg.iono_enable, ..scenario.data.iono };
		let max_blocks = cfg.duration_sec.map(|d| (d / TICK_SEC).round() as usize);
		Ok(Self{ synth, scenario, iono, elevation_mask_deg: cfg.elevation_mask_deg, max_blocks })
	}

	/// Number of i16 values in one block: an I and a Q per sample
	pub fn block_len(&self) -> usize { 2*self.synth.block_len() }

	/// Runs until the pipeline closes or the configured duration has been produced. `report` sees
	/// the channel table after the initial allocation and after every reallocation.
	pub fn run<N, F>(&self, pos:&dyn ReceiverPosition, pipeline:&StreamingPipeline, mut report:F) -> Result<RunSummary, SimError>
		where N: CarrierNco, F: FnMut(&SimulationState<N>, &GpsTime)
	{
		let sets = self.scenario.data.sets();
		let mut ieph = self.scenario.ieph;
		let mut grx = self.scenario.g0;
		let mut tick:usize = 0;

		let mut state:SimulationState<N> = SimulationState::default();
		let nsat = allocate_channels(&mut state, &sets[ieph], &self.iono, &grx, &pos.position(tick), self.elevation_mask_deg)?;
		info!("{} satellites visible at {}, {} channels allocated ({} NCO)", nsat, grx, state.num_active(), N::NAME);
		report(&state, &grx);

		// The first block is 100 ms after the start but still uses the first motion sample
		grx = grx.inc(TICK_SEC);
		let mut blocks:usize = 0;

		while self.max_blocks.map_or(true, |n| blocks < n) {
			let xyz = pos.position(tick);

			self.synth.refresh(&mut state, &sets[ieph], &self.iono, &grx, &xyz)?;
			if !pipeline.submit(|buf| self.synth.fill_block(&mut state, buf)) {
				debug!("Pipeline closed at {}", grx);
				break;
			}
			blocks += 1;

			if ((grx.sec*10.0 + 0.5) as i64) % FRAME_TICKS == 0 {
				for ch in state.channels.iter_mut().flatten() {
					ch.nav.generate(&grx, &ch.sbf, false);
				}

				// The next set takes over once its clock reference is less than an hour away
				let next = sets.get(ieph + 1).and_then(|set| set.iter().find(|e| e.valid));
				if let Some(eph) = next {
					if eph.toc.sub(&grx) < SECONDS_IN_HOUR {
						ieph += 1;
						for ch in state.channels.iter_mut().flatten() {
							ch.sbf = eph2sbf(&sets[ieph][ch.prn-1], &self.iono);
						}
						info!("Switched to ephemeris set {} at {}", ieph, grx);
					}
				}

				let nsat = allocate_channels(&mut state, &sets[ieph], &self.iono, &grx, &xyz, self.elevation_mask_deg)?;
				debug!("{} satellites visible at {}", nsat, grx);
				report(&state, &grx);
			}

			grx = grx.inc(TICK_SEC);
			tick += 1;
		}

		Ok(RunSummary{ blocks, end: grx, ieph })
	}

}
