extern crate clap;
extern crate colored;
extern crate rust_gps_sim;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::{Arg, App, ArgMatches};
use colored::*;
use rust_gps_sim::SimError;
use rust_gps_sim::block::pipeline::StreamingPipeline;
use rust_gps_sim::config::{self, CarrierPhaseMode, EphemerisFormat, PositionMode, SimConfig};
use rust_gps_sim::gnss::constants::R2D;
use rust_gps_sim::gnss::time::{DateTime, GpsTime};
use rust_gps_sim::gnss::gps_l1_ca::channel::allocation::SimulationState;
use rust_gps_sim::gnss::gps_l1_ca::pvt::ionosphere::IonoUtc;
use rust_gps_sim::gnss::gps_l1_ca::synthesis::nco::{CarrierNco, FixedPointNco, FloatNco};
use rust_gps_sim::io::json::JsonFile;
use rust_gps_sim::io::sink::{FileSink, NullSink};
use rust_gps_sim::simulator::{Scenario, Simulator};
use rust_gps_sim::utils::kinematics;

fn app<'a, 'b>() -> App<'a, 'b> {
	App::new("GPS L1 C/A Signal Simulator")
		.version("0.1.0")
		.about("Synthesizes GPS L1 C/A baseband I/Q from broadcast ephemerides and streams it to a transmitter")
		.arg(Arg::with_name("ephemeris")
			.short("e").long("ephemeris")
			.help("RINEX navigation file (plain or .gz) or JSON ephemeris table")
			.required(true).takes_value(true))
		.arg(Arg::with_name("rinex3")
			.short("3").long("rinex3")
			.help("Read the navigation file as RINEX 3"))
		.arg(Arg::with_name("format")
			.long("format").takes_value(true)
			.possible_values(&["auto", "rinex2", "rinex3", "json"])
			.conflicts_with("rinex3"))
		.arg(Arg::with_name("motion")
			.short("u").long("motion").takes_value(true)
			.help("User motion file, t,x,y,z ECEF lines at 10 Hz"))
		.arg(Arg::with_name("ecef")
			.short("c").long("ecef").takes_value(true)
			.help("Static receiver position x,y,z [m]")
			.conflicts_with("motion"))
		.arg(Arg::with_name("llh")
			.short("l").long("llh").takes_value(true)
			.help("Static receiver position lat,lon,height [deg,deg,m], default Tokyo Station")
			.conflicts_with_all(&["motion", "ecef"]))
		.arg(Arg::with_name("start")
			.short("t").long("start").takes_value(true)
			.help("Scenario start time YYYY/MM/DD,hh:mm:ss"))
		.arg(Arg::with_name("override")
			.short("T").long("override").takes_value(true)
			.help("Overwrite the ephemeris epochs to start at YYYY/MM/DD,hh:mm:ss, or 'now'")
			.conflicts_with("start"))
		.arg(Arg::with_name("duration")
			.short("d").long("duration").takes_value(true)
			.help("Seconds to simulate; runs until interrupted when omitted"))
		.arg(Arg::with_name("sample_rate_sps")
			.short("s").long("sample_rate_sps").takes_value(true)
			.help("Sampling frequency [samples/sec], at least 1e6, default 2.6e6"))
		.arg(Arg::with_name("gain")
			.short("A").long("gain").takes_value(true).allow_hyphen_values(true)
			.help("Transmit gain [dB], -80 to 0, default -20"))
		.arg(Arg::with_name("bandwidth")
			.short("B").long("bandwidth").takes_value(true)
			.help("RF bandwidth [MHz], 1 to 5, default 3"))
		.arg(Arg::with_name("elevation_mask")
			.short("m").long("elevation_mask").takes_value(true).allow_hyphen_values(true)
			.help("Elevation mask [deg], default 0"))
		.arg(Arg::with_name("no_iono")
			.short("i").long("no_iono")
			.help("Disable ionospheric delay"))
		.arg(Arg::with_name("nco")
			.long("nco").takes_value(true)
			.possible_values(&["float", "fixed"])
			.help("Carrier phase accumulator, default float"))
		.arg(Arg::with_name("output")
			.short("o").long("output").takes_value(true)
			.help("Write 16-bit I/Q to a file, or '-' for stdout; samples are discarded when omitted"))
		.arg(Arg::with_name("real_time")
			.long("real_time")
			.help("Pace discarded output to the sample rate"))
		.arg(Arg::with_name("save_json")
			.long("save_json").takes_value(true)
			.help("Write the loaded ephemeris table as JSON and exit"))
		.arg(Arg::with_name("dump_config")
			.long("dump_config")
			.help("Print the resolved configuration as JSON and exit"))
		.arg(Arg::with_name("verbose")
			.short("v").long("verbose"))
}

fn parse_f64(matches:&ArgMatches, name:&str) -> Result<Option<f64>, SimError> {
	match matches.value_of(name) {
		Some(s) => s.trim().parse::<f64>().map(Some).map_err(|_| SimError::InvalidArgument(format!("--{} {:?}", name, s))),
		None => Ok(None),
	}
}

fn build_config(matches:&ArgMatches) -> Result<SimConfig, SimError> {
	let mut cfg = SimConfig::default();

	cfg.ephemeris = PathBuf::from(matches.value_of("ephemeris").unwrap_or(""));
	cfg.format = match (matches.is_present("rinex3"), matches.value_of("format")) {
		(true, _)              => EphemerisFormat::Rinex3,
		(_, Some("rinex2"))    => EphemerisFormat::Rinex2,
		(_, Some("rinex3"))    => EphemerisFormat::Rinex3,
		(_, Some("json"))      => EphemerisFormat::Json,
		(_, _)                 => EphemerisFormat::Auto,
	};

	if let Some(path) = matches.value_of("motion") {
		cfg.position = PositionMode::MotionFile(PathBuf::from(path));
	} else if let Some(s) = matches.value_of("ecef") {
		cfg.position = PositionMode::StaticEcef(config::parse_triplet(s)?);
	} else if let Some(s) = matches.value_of("llh") {
		cfg.position = PositionMode::StaticLlh(config::parse_triplet(s)?);
	}

	if let Some(s) = matches.value_of("start") {
		cfg.start_time = Some(s.parse::<DateTime>()?);
	}
	if let Some(s) = matches.value_of("override") {
		cfg.start_time = Some(if s == "now" { config::now_date() } else { s.parse::<DateTime>()? });
		cfg.time_override = true;
	}

	cfg.duration_sec = parse_f64(matches, "duration")?;
	if let Some(fs) = parse_f64(matches, "sample_rate_sps")? { cfg.tx.sample_rate_hz = fs; }
	if let Some(a) = parse_f64(matches, "gain")? { cfg.tx.gain_db = a; }
	if let Some(b) = parse_f64(matches, "bandwidth")? { cfg.tx.bandwidth_hz = b*1.0e6; }
	if let Some(m) = parse_f64(matches, "elevation_mask")? { cfg.elevation_mask_deg = m; }

	cfg.iono_enable = !matches.is_present("no_iono");
	cfg.carrier_nco = match matches.value_of("nco") {
		Some("fixed") => CarrierPhaseMode::Fixed,
		_             => CarrierPhaseMode::Float,
	};
	cfg.output = matches.value_of("output").map(|s| s.to_string());
	cfg.real_time = matches.is_present("real_time");
	cfg.verbose = matches.is_present("verbose");

	cfg.validate()
}

fn print_iono(iono:&IonoUtc) {
	eprintln!("  {:12.3e} {:12.3e} {:12.3e} {:12.3e}", iono.alpha0, iono.alpha1, iono.alpha2, iono.alpha3);
	eprintln!("  {:12.3e} {:12.3e} {:12.3e} {:12.3e}", iono.beta0, iono.beta1, iono.beta2, iono.beta3);
	eprintln!("  {:19.11e} {:19.11e}  {:9} {:9}", iono.a0, iono.a1, iono.tot, iono.wnt);
	eprintln!("  {:6}", iono.dtls);
}

fn print_channels<N: CarrierNco>(state:&SimulationState<N>, g:&GpsTime) {
	eprintln!("{}", format!("Channels at {} ({})", g.to_date(), g).cyan());
	eprintln!("PRN   Az    El     Range     Iono");
	for ch in state.active() {
		eprintln!("{:02} {:6.1} {:5.1} {:11.1} {:5.1}", ch.prn, ch.azel.az*R2D, ch.azel.el*R2D, ch.rho0.d, ch.rho0.iono_delay);
	}
}

fn start_pipeline(cfg:&SimConfig, block_len:usize) -> Result<StreamingPipeline, SimError> {
	match cfg.output.as_deref() {
		Some("-") => StreamingPipeline::start(FileSink::new(BufWriter::new(std::io::stdout())), cfg.tx.clone(), block_len),
		Some(path) => {
			let file = File::create(path)?;
			StreamingPipeline::start(FileSink::new(BufWriter::new(file)), cfg.tx.clone(), block_len)
		},
		None => StreamingPipeline::start(NullSink::new(cfg.real_time), cfg.tx.clone(), block_len),
	}
}

fn run(matches:&ArgMatches) -> Result<(), SimError> {
	let cfg = build_config(matches)?;

	if matches.is_present("dump_config") {
		println!("{}", serde_json::to_string_pretty(&cfg)?);
		return Ok(());
	}

	let data = cfg.ephemeris_provider().load()?;
	if let Some(path) = matches.value_of("save_json") {
		JsonFile::new(path).save(&data)?;
		eprintln!("Wrote {} ephemeris sets to {}", data.num_sets(), path);
		return Ok(());
	}

	if let Some(date) = &data.run_date { eprintln!("RINEX date = {}", date); }

	let scenario = Scenario::resolve(data, cfg.start_time, cfg.time_override)?;
	if cfg.verbose { print_iono(&scenario.data.iono); }

	let pos = cfg.receiver_position()?;
	let xyz = pos.position(0);
	let llh = kinematics::ecef_to_wgs84(&xyz);
	eprintln!("xyz = {:11.1}, {:11.1}, {:11.1}", xyz[0], xyz[1], xyz[2]);
	eprintln!("llh = {:11.6}, {:11.6}, {:11.1}", llh.latitude*R2D, llh.longitude*R2D, llh.height_above_ellipsoid);
	eprintln!("Start time = {} ({})", scenario.g0.to_date(), scenario.g0);
	eprintln!("Gain = {:.1} [dB], bandwidth = {:.1} [MHz]", cfg.tx.gain_db, cfg.tx.bandwidth_hz / 1.0e6);

	let sim = Simulator::new(&cfg, scenario)?;
	let pipeline = start_pipeline(&cfg, sim.block_len())?;

	let rv = pipeline.rendezvous();
	if let Err(e) = ctrlc::set_handler(move || rv.close()) {
		log::warn!("Unable to install the interrupt handler: {}", e);
	}

	let summary = match cfg.carrier_nco {
		CarrierPhaseMode::Float => sim.run::<FloatNco, _>(pos.as_ref(), &pipeline, print_channels::<FloatNco>),
		CarrierPhaseMode::Fixed => sim.run::<FixedPointNco, _>(pos.as_ref(), &pipeline, print_channels::<FixedPointNco>),
	};

	// The transmit thread is joined whether or not synthesis failed
	let pushed = pipeline.shutdown();
	let summary = summary?;
	let pushed = pushed?;

	eprintln!("{}", format!("Done: {} blocks ({:.1} s) synthesized, {} transmitted, ending at {}",
		summary.blocks, summary.blocks as f64 * 0.1, pushed, summary.end).green().bold());
	Ok(())
}

fn main() {
	let matches = app().get_matches();

	let level = if matches.is_present("verbose") { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
		.format_timestamp_millis()
		.init();

	if let Err(e) = run(&matches) {
		eprintln!("{}", format!("Error: {}", e).red().bold());
		std::process::exit(1);
	}
}
