use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use log::info;

use serde_json::Value as JSValue;

use covid_dashboard::{Dashboard, DashboardConfig, Scale, Selection, Session, parse_selection_date, run_session};


/// Serves the COVID-19 county/state views of a USAFacts confirmed-cases
/// file as JSON.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
struct Args {
	/// (file path, optional) JSON configuration file.
	#[clap(short, long, value_parser)]
	config: Option<PathBuf>,

	/// (file path) USAFacts CSV, plain or .gz. Overrides the configuration
	/// and $COVID_DASHBOARD_INPUT.
	#[clap(short, long, value_parser)]
	input: Option<PathBuf>,

	/// Two-letter state code (default NY or the configured defaultState).
	#[clap(short, long, value_parser)]
	state: Option<String>,

	/// Date as 2020-04-03 or 4/3/20 (default: latest date in the file).
	#[clap(short, long, value_parser)]
	date: Option<String>,

	/// linear or log
	#[clap(long, value_parser)]
	scale: Option<String>,

	/// One of all, county-map, state-map, leaderboard, time-series, bar.
	#[clap(long, value_parser, default_value = "all")]
	view: String,

	/// Read one JSON selection event per line from stdin and answer each
	/// with one line of JSON.
	#[clap(long, takes_value = false)]
	interactive: bool,

	/// Turn on debug logging.
	#[clap(long, takes_value = false)]
	verbose: bool,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
	All,
	CountyMap,
	StateMap,
	Leaderboard,
	TimeSeries,
	Bar,
}

impl FromStr for View {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"all" => Ok(Self::All),
			"county-map" => Ok(Self::CountyMap),
			"state-map" => Ok(Self::StateMap),
			"leaderboard" => Ok(Self::Leaderboard),
			"time-series" => Ok(Self::TimeSeries),
			"bar" => Ok(Self::Bar),
			other => Err(format!("unknown view {:?}", other)),
		}
	}
}


fn initial_selection(args: &Args, config: &DashboardConfig, dashboard: &Dashboard) -> Result<Selection, Box<dyn std::error::Error>> {
	let state = args.state.as_deref()
		.or(config.default_state.as_deref())
		.unwrap_or(Selection::DEFAULT_STATE);
	let mut selection = Selection::initial_for(dashboard, state)?;
	if let Some(date) = &args.date {
		selection.date = parse_selection_date(date)?;
	}
	if let Some(scale) = &args.scale {
		selection.scale = scale.parse::<Scale>()?;
	}
	selection.validate(dashboard)?;
	Ok(selection)
}

fn render(dashboard: &Dashboard, selection: &Selection, view: View) -> Result<JSValue, Box<dyn std::error::Error>> {
	let value = match view {
		View::All => serde_json::to_value(dashboard.views(selection)?)?,
		View::CountyMap => serde_json::to_value(dashboard.county_choropleth(&selection.state, selection.date)?)?,
		View::StateMap => serde_json::to_value(dashboard.state_choropleth(selection.date)?)?,
		View::Leaderboard => serde_json::to_value(dashboard.leaderboard(selection.date)?)?,
		View::TimeSeries => serde_json::to_value(dashboard.time_series(&selection.state, selection.date, selection.scale)?)?,
		View::Bar => serde_json::to_value(dashboard.bar_chart(selection.date)?)?,
	};
	Ok(value)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	env_logger::Builder::from_env(
		env_logger::Env::default().default_filter_or(if args.verbose { "debug" } else { "info" })
	).init();

	let view = args.view.parse::<View>()?;

	let mut config = match &args.config {
		Some(path) => DashboardConfig::from_path(path)?,
		None => DashboardConfig::default(),
	};
	config.apply_env();
	if let Some(input) = &args.input {
		config.input = Some(input.clone());
	}

	// a broken input file must stop us before anything is shown
	let dashboard = config.open_dashboard()?;
	let selection = initial_selection(&args, &config, &dashboard)?;
	info!("initial selection: {} on {} ({})", selection.state, selection.date, selection.scale);

	let stdout = io::stdout();
	if args.interactive {
		let mut session = Session::new(&dashboard, selection)?;
		let stdin = io::stdin();
		let n = run_session(&mut session, stdin.lock(), stdout.lock())?;
		info!("handled {} events", n);
		return Ok(())
	}

	let value = render(&dashboard, &selection, view)?;
	let mut out = stdout.lock();
	serde_json::to_writer_pretty(&mut out, &value)?;
	out.write_all(b"\n")?;
	Ok(())
}
